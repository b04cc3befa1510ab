/// Creates the progress bar shown while constituent tables are resolved.
///
/// Draws to stderr so JSON on stdout stays clean. Hidden when `visible` is
/// false or there is nothing worth reporting.
pub fn fetch_progress(len: usize, visible: bool) -> indicatif::ProgressBar {
    if !visible || len < 2 {
        return indicatif::ProgressBar::hidden();
    }

    let bar = indicatif::ProgressBar::with_draw_target(Some(len as u64), indicatif::ProgressDrawTarget::stderr());
    let style = indicatif::ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} indices")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}
