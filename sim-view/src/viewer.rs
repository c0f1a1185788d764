//! Interactive particle-life viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the [`Simulation`] and
//! implements [`eframe::App`] to render and control it through an egui UI.

use std::cmp::Ordering;

use eframe::App;
use glam::DVec2;
use sim_core::{Simulation, types::TypeId};

/// Main application state for the interactive viewer.
///
/// The typical per-frame update is:
/// 1. Handle UI interactions / input, including matrix edits.
/// 2. If `running` is `true` and enough time has passed, call [`Viewer::step_once`].
/// 3. Render the particles inside the world rectangle.
///
/// ### Fields
/// - `sim` - The simulation being shown.
/// - `colors` - One colour per particle type.
/// - `max_steps` - Auto-run stops once the step counter reaches this.
/// - `halted` - Set when a step failed; the simulation cannot continue.
///
/// - `running` - Whether the simulation is currently auto-advancing.
/// - `zoom` - Screen pixels per world unit.
/// - `pan` - Screen-space pan offset in pixels.
/// - `fit_pending` - Recompute `zoom` to fit the world on the next frame.
///
/// - `step_interval` - Minimum time between automatic steps (seconds).
/// - `last_step_time` - Time stamp of the last step (egui time).
/// - `last_step_dt` - Actual time delta between the last two steps (for display only).
pub struct Viewer {
    sim: Simulation,
    colors: Vec<egui::Color32>,
    max_steps: Option<u64>,
    halted: Option<String>,

    running: bool,
    zoom: f32,
    pan: egui::Vec2,
    fit_pending: bool,

    step_interval: f64,
    last_step_time: f64,
    last_step_dt: f64,
}

/// One colour per type.
///
/// Configured RGB triples come first; a short list is padded with evenly
/// spaced hues and a long one is truncated.
fn type_colors(n: usize, configured: Option<&[[u8; 3]]>) -> Vec<egui::Color32> {
    let hues = (0..n).map(|t| {
        egui::Color32::from(egui::ecolor::Hsva::new(t as f32 / n as f32, 0.75, 0.95, 1.0))
    });
    let Some(configured) = configured.filter(|c| !c.is_empty()) else {
        log::info!("no colours configured, using the default palette");
        return hues.collect();
    };

    match configured.len().cmp(&n) {
        Ordering::Less => log::warn!(
            "{} colours configured for {n} types, padding from the default palette",
            configured.len()
        ),
        Ordering::Greater => log::warn!(
            "{} colours configured for {n} types, ignoring the extra ones",
            configured.len()
        ),
        Ordering::Equal => log::info!("loaded {n} colours"),
    }
    configured
        .iter()
        .map(|&[r, g, b]| egui::Color32::from_rgb(r, g, b))
        .chain(hues.skip(configured.len()))
        .take(n)
        .collect()
}

impl Viewer {
    pub fn new(sim: Simulation, max_steps: Option<u64>, colors: Option<&[[u8; 3]]>) -> Self {
        let colors = type_colors(sim.config().particle_types, colors);
        Self {
            sim,
            colors,
            max_steps,
            halted: None,
            running: false,
            zoom: 0.5,
            pan: egui::vec2(0.0, 0.0),
            fit_pending: true,
            step_interval: 0.0,
            last_step_time: 0.0,
            last_step_dt: 0.0,
        }
    }

    /// Re-seeds the particles and stops auto-running.
    ///
    /// The interaction matrix and camera are kept.
    fn reset(&mut self) {
        match self.sim.reset() {
            Ok(()) => self.halted = None,
            Err(e) => {
                log::error!("reset failed: {e}");
                self.halted = Some(e.to_string());
            }
        }
        self.running = false;
    }

    /// Advances the simulation by a single step.
    ///
    /// A failed step halts the viewer: auto-run stops and further steps are
    /// refused until [`Viewer::reset`].
    fn step_once(&mut self) {
        if self.halted.is_some() {
            return;
        }
        if let Err(e) = self.sim.step() {
            self.halted = Some(e.to_string());
            self.running = false;
            return;
        }
        if self.max_steps.is_some_and(|max| self.sim.step_count() >= max) {
            log::info!("reached max_steps at step {}", self.sim.step_count());
            self.running = false;
        }
    }

    fn world_center(&self) -> DVec2 {
        self.sim.bounds().size * 0.5
    }

    /// Converts a world-space position to screen-space.
    ///
    /// The world center is placed at the center of `rect`, scaled by `zoom`
    /// and offset by `pan`. World y grows downward, as on screen.
    fn world_to_screen(&self, p: DVec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        let d = (p - self.world_center()).as_vec2();
        egui::pos2(
            center.x + d.x * self.zoom + self.pan.x,
            center.y + d.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`] (up to floating point rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> DVec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (p.y - center.y - self.pan.y) / self.zoom;
        self.world_center() + DVec2::new(x as f64, y as f64)
    }

    fn fit_to(&mut self, rect: egui::Rect) {
        let world = self.sim.bounds().size.as_vec2();
        self.zoom = (rect.width() / world.x).min(rect.height() / world.y) * 0.95;
        self.pan = egui::vec2(0.0, 0.0);
        self.fit_pending = false;
    }

    /// Builds the top panel UI (run controls, stepping, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let can_run = self.halted.is_none();
                if ui
                    .add_enabled(
                        can_run,
                        egui::Button::new(if self.running { "⏸ Pause" } else { "▶ Run" }),
                    )
                    .clicked()
                {
                    self.running = !self.running;
                }

                ui.add(
                    egui::DragValue::new(&mut self.step_interval)
                        .prefix("interval = ")
                        .range(0.0..=1.0)
                        .speed(0.01),
                );

                if ui.add_enabled(can_run, egui::Button::new("Step")).clicked() {
                    let now = ctx.input(|i| i.time);
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = now - self.last_step_time;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.05..=20.0).text("Zoom"));
                if ui.button("Fit").clicked() {
                    self.fit_pending = true;
                }
            });
        });
    }

    /// Builds the bottom status bar (step, time, particle count, speed).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("dt last = {:.3} s", self.last_step_dt));
                ui.separator();
                ui.label(format!("max speed = {:.3}", self.sim.particles().max_speed()));
                ui.label(format!("mean speed = {:.3}", self.sim.particles().mean_speed()));
                ui.label(format!("particles = {}", self.sim.particles().len()));
                ui.label(format!("t = {:.1}", self.sim.time()));
                ui.label(format!("step = {}", self.sim.step_count()));
                if let Some(reason) = &self.halted {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, format!("halted: {reason}"));
                }
            });
        });
    }

    /// Editable interaction matrix. Row is the source type, column the target.
    fn ui_matrix(&mut self, ui: &mut egui::Ui) {
        let n = self.sim.matrix().size();
        let mut edits: Vec<(TypeId, TypeId, f64)> = Vec::new();

        egui::Grid::new("interaction_matrix")
            .spacing(egui::vec2(4.0, 4.0))
            .show(ui, |ui| {
                ui.label("src \\ dst");
                for target in 0..n {
                    ui.colored_label(self.colors[target], "●");
                }
                ui.end_row();

                for source in 0..n {
                    ui.colored_label(self.colors[source], "●");
                    for target in 0..n {
                        let mut value = self.sim.matrix().get(source, target);
                        // Loaded values outside the drag range are left as they are.
                        let response = ui.add(
                            egui::DragValue::new(&mut value)
                                .range(-1.0..=1.0)
                                .clamp_existing_to_range(false)
                                .speed(0.01)
                                .fixed_decimals(2),
                        );
                        if response.changed() {
                            edits.push((source, target, value));
                        }
                    }
                    ui.end_row();
                }
            });

        for (source, target, value) in edits {
            if let Err(e) = self.sim.set_interaction(source, target, value) {
                log::warn!("matrix edit rejected: {e}");
            }
        }

        ui.horizontal(|ui| {
            if ui.button("Reset matrix").clicked() {
                self.sim.reset_matrix();
            }
            if ui.button("Randomize matrix").clicked() {
                self.sim.randomize_matrix(rand::random());
            }
        });
    }

    /// Read-only view of the run parameters.
    fn ui_params(&self, ui: &mut egui::Ui) {
        let cfg = self.sim.config();
        egui::Grid::new("params").num_columns(2).show(ui, |ui| {
            let rows = [
                ("particles", cfg.particle_count.to_string()),
                ("types", cfg.particle_types.to_string()),
                ("r_min", format!("{:.2}", cfg.interaction_radius_min)),
                ("r_max", format!("{:.2}", cfg.interaction_radius_max)),
                ("repulsion", format!("{:.2}", cfg.repulsion_strength)),
                ("friction", format!("{:.3}", cfg.friction)),
                ("dt", format!("{:.3}", cfg.dt)),
                ("jitter", format!("{:.3}", cfg.jitter_threshold)),
                (
                    "world",
                    format!("{:.0} x {:.0}", cfg.world_width, cfg.world_height),
                ),
                ("seed", cfg.seed.to_string()),
                ("parallel", cfg.parallel.to_string()),
            ];
            for (name, value) in rows {
                ui.label(name);
                ui.label(value);
                ui.end_row();
            }
        });
    }

    /// Builds the right-hand panel with the matrix editor and parameters.
    fn ui_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("side_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Interaction matrix");
                self.ui_matrix(ui);

                ui.separator();
                ui.heading("Parameters");
                self.ui_params(ui);
            });
    }

    /// Builds the central panel where particles are drawn.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            if self.fit_pending {
                self.fit_to(rect);
            }

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.05, 20.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            painter.rect_filled(rect, 0.0, egui::Color32::from_gray(12));
            let world = egui::Rect::from_two_pos(
                self.world_to_screen(DVec2::ZERO, rect),
                self.world_to_screen(self.sim.bounds().size, rect),
            );
            painter.rect_stroke(
                world,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::from_gray(60)),
                egui::StrokeKind::Outside,
            );

            let snap = self.sim.snapshot();
            let r = (1.5 * self.zoom).max(1.0);
            for (&p, &t) in snap.positions.iter().zip(snap.types) {
                painter.circle_filled(self.world_to_screen(p, rect), r, self.colors[t]);
            }

            // Auto-run simulation if requested.
            if self.running {
                let now = ctx.input(|i| i.time);
                let elapsed = now - self.last_step_time;
                if elapsed >= self.step_interval {
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = elapsed;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                ctx.request_repaint();
            }
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_side_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
