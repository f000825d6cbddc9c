//! Progress rendering for the upload step

/// Width of the progress bar in cells
const BAR_CELLS: usize = 20;

/// Render the in-place progress line for a completed fraction
///
/// One cell represents 5%, so the bar fills `round(percent / 5)` cells.
pub fn render_progress(fraction: f64) -> String {
    let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
    let filled = (percent as f64 / 5.0).round() as usize;
    let filled = filled.min(BAR_CELLS);

    let bar = "█".repeat(filled) + &"░".repeat(BAR_CELLS - filled);
    format!("[{}] {}% Complete", bar, percent)
}

/// Public watch URL for an uploaded video
pub fn watch_url(video_id: &str) -> String {
    format!("https://youtu.be/{}", video_id)
}
