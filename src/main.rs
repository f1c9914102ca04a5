use annotate_canvas::app::AnnotateApp;
use annotate_canvas::config::Config;
use annotate_canvas::store::Project;
use anyhow::Context;
use clap::Parser;
use eframe::egui;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::parse();
    config.validate()?;

    let project = Project::open(config.images.clone(), &config.tags)
        .context("failed to open images")?;

    let title = format!(
        "annotate-canvas — {}",
        project
            .current_image()
            .file_name()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.width, config.height])
            .with_title(&title),
        ..Default::default()
    };

    let tool = config.tool;
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| Ok(Box::new(AnnotateApp::new(cc, project, tool)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run eframe: {e}"))
}
