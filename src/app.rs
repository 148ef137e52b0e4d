use crate::{
    config::DreamerConfig,
    controller::{Controller, TickOutcome},
    error::{DreamerError, Result},
    listener::Listener,
};
use eframe::egui;
use std::time::{Duration, Instant};

pub struct DreamerApp {
    controller: Controller,
    listener: Listener,
    poll_interval: Duration,
    last_tick: Option<Instant>,
    texture: Option<egui::TextureHandle>,
}

impl DreamerApp {
    pub fn new(controller: Controller, listener: Listener, poll_interval: Duration) -> Self {
        Self {
            controller,
            listener,
            poll_interval,
            last_tick: None,
            texture: None,
        }
    }

    fn poll(&mut self, ctx: &egui::Context) {
        let due = self
            .last_tick
            .map_or(true, |last| last.elapsed() >= self.poll_interval);
        if due {
            self.last_tick = Some(Instant::now());
            if let TickOutcome::GenerationFinished(path) = self.controller.tick() {
                log::debug!("Loading {} into the viewer", path.display());
            }
        }

        if let Some(display) = self.controller.take_display() {
            let image = egui::ColorImage::from_rgba_unmultiplied(display.size, &display.rgba);
            let name = display.path.display().to_string();
            self.texture = Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR));
        }

        ctx.request_repaint_after(self.poll_interval);
    }
}

impl eframe::App for DreamerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.controller.is_generating() {
                    ui.add(egui::Spinner::new());
                }
                ui.label(self.controller.status().to_string());
            });

            ui.add(
                egui::TextEdit::singleline(&mut self.controller.prompt)
                    .hint_text("Prompt")
                    .desired_width(f32::INFINITY),
            );
            ui.add(
                egui::TextEdit::singleline(&mut self.controller.negative_prompt)
                    .hint_text("Negative prompt")
                    .desired_width(f32::INFINITY),
            );
            ui.separator();

            if let Some(texture) = &self.texture {
                ui.centered_and_justified(|ui| {
                    ui.add(egui::Image::from_texture(texture).shrink_to_fit());
                });
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("👋 Window closed, stopping listener");
        self.listener.shutdown();
    }
}

pub fn run(config: &DreamerConfig, app: DreamerApp) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(&config.window_title),
        ..Default::default()
    };

    eframe::run_native(
        &config.window_title,
        native_options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| DreamerError::Gui(e.to_string()))
}
