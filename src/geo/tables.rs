//! Region and ISP code tables, plus great-circle distance.

/// Coordinates and native name of a region.
#[derive(Debug, Clone, Copy)]
pub struct RegionInfo {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Region code → capital coordinates. Codes follow GB/T 2260.
static REGIONS: &[(&str, RegionInfo)] = &[
    ("BJ", RegionInfo { name: "北京", latitude: 39.90403, longitude: 116.40753 }),
    ("TJ", RegionInfo { name: "天津", latitude: 39.1467, longitude: 117.2056 }),
    ("HE", RegionInfo { name: "河北", latitude: 38.0425, longitude: 114.51 }),
    ("SX", RegionInfo { name: "山西", latitude: 37.8704, longitude: 112.5497 }),
    ("NM", RegionInfo { name: "内蒙古", latitude: 40.842, longitude: 111.749 }),
    ("LN", RegionInfo { name: "辽宁", latitude: 41.8025, longitude: 123.428056 }),
    ("JL", RegionInfo { name: "吉林", latitude: 43.897, longitude: 125.326 }),
    ("HL", RegionInfo { name: "黑龙江", latitude: 45.7576, longitude: 126.6409 }),
    ("SH", RegionInfo { name: "上海", latitude: 31.228611, longitude: 121.474722 }),
    ("JS", RegionInfo { name: "江苏", latitude: 32.060833, longitude: 118.778889 }),
    ("ZJ", RegionInfo { name: "浙江", latitude: 30.267, longitude: 120.153 }),
    ("AH", RegionInfo { name: "安徽", latitude: 31.8206, longitude: 117.2273 }),
    ("FJ", RegionInfo { name: "福建", latitude: 26.0743, longitude: 119.2964 }),
    ("JX", RegionInfo { name: "江西", latitude: 28.683, longitude: 115.858 }),
    ("SD", RegionInfo { name: "山东", latitude: 36.6702, longitude: 117.0207 }),
    ("HA", RegionInfo { name: "河南", latitude: 34.764, longitude: 113.684 }),
    ("HB", RegionInfo { name: "湖北", latitude: 30.5934, longitude: 114.3046 }),
    ("HN", RegionInfo { name: "湖南", latitude: 28.228, longitude: 112.939 }),
    ("GD", RegionInfo { name: "广东", latitude: 23.13, longitude: 113.26 }),
    ("GX", RegionInfo { name: "广西", latitude: 22.8167, longitude: 108.3275 }),
    ("HI", RegionInfo { name: "海南", latitude: 20.0186, longitude: 110.3488 }),
    ("CQ", RegionInfo { name: "重庆", latitude: 29.5637, longitude: 106.5504 }),
    ("SC", RegionInfo { name: "四川", latitude: 30.66, longitude: 104.063333 }),
    ("GZ", RegionInfo { name: "贵州", latitude: 26.647, longitude: 106.63 }),
    ("YN", RegionInfo { name: "云南", latitude: 25.0464, longitude: 102.7094 }),
    ("XZ", RegionInfo { name: "西藏", latitude: 29.6487, longitude: 91.1174 }),
    ("SN", RegionInfo { name: "陕西", latitude: 34.265, longitude: 108.954 }),
    ("GS", RegionInfo { name: "甘肃", latitude: 36.0606, longitude: 103.8268 }),
    ("QH", RegionInfo { name: "青海", latitude: 36.6224, longitude: 101.7804 }),
    ("NX", RegionInfo { name: "宁夏", latitude: 38.472, longitude: 106.2589 }),
    ("XJ", RegionInfo { name: "新疆", latitude: 43.8225, longitude: 87.6125 }),
    ("TW", RegionInfo { name: "台湾", latitude: 25.0375, longitude: 121.5625 }),
    ("HK", RegionInfo { name: "香港", latitude: 22.3, longitude: 114.2 }),
    ("MO", RegionInfo { name: "澳门", latitude: 22.166667, longitude: 113.55 }),
];

/// ISP code → native name as it appears in the geo database's `line` field.
static ISPS: &[(&str, &str)] = &[
    ("CERNET", "教育网"),
    ("CMCC", "移动"),
    ("CHINANET", "电信"),
    ("UNICOM", "联通"),
    ("CSTNET", "科技网"),
    ("DRPENG", "鹏博士"),
    ("CBNET", "广电网"),
];

/// Look up the coordinates of a region code.
pub fn region_info(code: &str) -> Option<RegionInfo> {
    REGIONS.iter().find(|(c, _)| *c == code).map(|(_, info)| *info)
}

/// Look up the region code for a native region name.
pub fn region_name_to_code(name: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(_, info)| info.name == name)
        .map(|(code, _)| *code)
}

/// Look up the ISP code for a native ISP name.
pub fn isp_name_to_code(name: &str) -> Option<&'static str> {
    ISPS.iter().find(|(_, n)| *n == name).map(|(code, _)| *code)
}

/// The radius of the Earth in metres.
pub const EARTH_RADIUS: f64 = 6_378.1e3;

/// Distances closer than this are considered equal (metres).
pub const DISTANCE_EPSILON: f64 = 10.0;

/// Great-circle distance between two points given in degrees, in metres.
///
/// Haversine formula, following
/// https://www.movable-type.co.uk/scripts/latlong.html
pub fn haversine(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (long2 - long1).to_radians();
    let a = (d_phi / 2.0).sin() * (d_phi / 2.0).sin()
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin() * (d_lambda / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS * c
}

/// Distance between two region codes in metres.
///
/// Unknown codes yield positive infinity.
pub fn distance(code1: &str, code2: &str) -> f64 {
    match (region_info(code1), region_info(code2)) {
        (Some(a), Some(b)) => haversine(a.latitude, a.longitude, b.latitude, b.longitude),
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference distances between capitals, 5 km tolerance.
    const DISTANCES: &[(&str, &str, f64)] = &[
        ("BJ", "SH", 1066e3), // Beijing - Shanghai
        ("BJ", "HK", 1966e3), // Beijing - Hong Kong
        ("SH", "SN", 1219e3), // Shanghai - Xi'an
        ("SH", "XJ", 3270e3), // Shanghai - Urumqi
        ("HB", "XZ", 2227e3), // Wuhan - Lhasa
        ("GS", "XJ", 1624e3), // Lanzhou - Urumqi
    ];

    const TOLERANCE: f64 = 5e3;

    #[test]
    fn test_distance_references() {
        for (code1, code2, reference) in DISTANCES {
            let result = distance(code1, code2);
            assert!(
                (result - reference).abs() < TOLERANCE,
                "distance {code1}-{code2}: expected {:.0} km, got {:.0} km",
                reference / 1e3,
                result / 1e3,
            );
        }
    }

    #[test]
    fn test_distance_unknown_code() {
        assert!(distance("BJ", "??").is_infinite());
        assert!(distance("??", "BJ").is_infinite());
        assert!(distance("", "").is_infinite());
    }

    #[test]
    fn test_name_lookups() {
        assert_eq!(region_name_to_code("北京"), Some("BJ"));
        assert_eq!(region_name_to_code("unknown"), None);
        assert_eq!(isp_name_to_code("教育网"), Some("CERNET"));
        assert_eq!(isp_name_to_code("unknown"), None);
    }
}
