use chrono::{DateTime, FixedOffset, Local};
use std::time::SystemTime;

pub fn system_time_to_timestamp(time: SystemTime) -> DateTime<FixedOffset> {
    let datetime: DateTime<Local> = time.into();
    datetime.fixed_offset()
}

pub fn format_timestamp(value: &DateTime<FixedOffset>) -> String {
    value.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} bytes", bytes)
    } else {
        format!("{value:.2} {} ({} bytes)", UNITS[unit_index], bytes)
    }
}

/// Línea `<etiqueta>: <valor>` con la etiqueta alineada a 30 columnas.
pub fn format_field_line(label: &str, value: &str) -> String {
    format!("{label:<30}: {value}")
}
