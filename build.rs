use std::time::{SystemTime, UNIX_EPOCH};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    // Reproducible builds pin the stamp via SOURCE_DATE_EPOCH.
    let epoch = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

    let (date, time) = format_build_stamp(epoch);
    println!("cargo:rustc-env=OTAPORTAL_BUILD_DATE={date}");
    println!("cargo:rustc-env=OTAPORTAL_BUILD_TIME={time}");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

/// Render `epoch` (UTC) in the C preprocessor `__DATE__` / `__TIME__` layout:
/// `"Mmm dd yyyy"` (day space-padded) and `"hh:mm:ss"`.
fn format_build_stamp(epoch: u64) -> (String, String) {
    let days = (epoch / 86_400) as i64;
    let secs = epoch % 86_400;

    // Civil-from-days (Howard Hinnant), valid for the whole u64 epoch range we care about.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    let date = format!("{} {:>2} {}", MONTHS[(month - 1) as usize], day, year);
    let time = format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    (date, time)
}
