use std::path::Path;

/// Everything the viewer's info panel shows for one photo.
pub struct PhotoInfo {
    pub filename: String,
    pub file_size: u64,
    pub dimensions: Option<(u32, u32)>,
    pub date_taken: Option<String>,
    pub date_modified: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_model: Option<String>,
    pub exposure_time: Option<String>,
    pub f_number: Option<String>,
    pub iso: Option<String>,
    pub focal_length: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
}

impl PhotoInfo {
    /// Compact "1/250s  f/2.8  ISO 400" line, empty when nothing is known.
    pub fn exposure_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref exp) = self.exposure_time {
            parts.push(format!("{}s", exp));
        }
        if let Some(ref f) = self.f_number {
            parts.push(format!("f/{}", f));
        }
        if let Some(ref iso) = self.iso {
            parts.push(format!("ISO {}", iso));
        }
        parts.join("  ")
    }
}

pub fn read_photo_info(path: &Path) -> PhotoInfo {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let fs_meta = std::fs::metadata(path).ok();
    let file_size = fs_meta.as_ref().map(|m| m.len()).unwrap_or(0);
    let date_modified = fs_meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(format_system_time);

    let dimensions = image::image_dimensions(path).ok();

    let exif = read_exif(path);
    let get_str = |tag| {
        exif.as_ref().and_then(|e| {
            e.get_field(tag, exif::In::PRIMARY)
                .map(|f| f.display_value().to_string())
        })
    };

    PhotoInfo {
        filename,
        file_size,
        dimensions,
        date_taken: get_str(exif::Tag::DateTimeOriginal),
        date_modified,
        camera_make: get_str(exif::Tag::Make),
        camera_model: get_str(exif::Tag::Model),
        lens_model: get_str(exif::Tag::LensModel),
        exposure_time: get_str(exif::Tag::ExposureTime),
        f_number: get_str(exif::Tag::FNumber),
        iso: get_str(exif::Tag::PhotographicSensitivity),
        focal_length: get_str(exif::Tag::FocalLength),
        gps_latitude: exif.as_ref().and_then(|e| {
            gps_coord(e, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef)
        }),
        gps_longitude: exif.as_ref().and_then(|e| {
            gps_coord(e, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef)
        }),
    }
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).ok()
}

/// Degrees/minutes/seconds rationals to a signed decimal coordinate.
fn gps_coord(exif: &exif::Exif, coord_tag: exif::Tag, ref_tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(coord_tag, exif::In::PRIMARY)?;
    let rationals = match &field.value {
        exif::Value::Rational(v) if v.len() >= 3 => v,
        _ => return None,
    };

    let mut coord = rationals[0].to_f64()
        + rationals[1].to_f64() / 60.0
        + rationals[2].to_f64() / 3600.0;

    let ref_str = exif
        .get_field(ref_tag, exif::In::PRIMARY)?
        .display_value()
        .to_string();
    if ref_str == "S" || ref_str == "W" {
        coord = -coord;
    }
    Some(coord)
}

// --- Formatting helpers ---

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_system_time(time: std::time::SystemTime) -> String {
    let duration = time
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs() as i64;

    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

// howardhinnant.github.io/date_algorithms.html
fn civil_from_days(mut days: i64) -> (i64, i64, i64) {
    days += 719468;
    let era = if days >= 0 { days } else { days - 146096 } / 146097;
    let doe = days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}
