use std::fs;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use eframe::egui;
use egui_phosphor::regular as icon;

use crate::backend::Backend;
use crate::clipboard;
use crate::config::Config;
use crate::languages::LANGUAGES;
use crate::state::AppState;

const SOURCE_HINT: &str = "Enter or paste your text here...";
const OUTPUT_HINT: &str = "Translation will appear here...";

struct SettingsDraft {
    backend: Backend,
    api_key: String,
    show_key: bool,
}

enum SettingsAction {
    Apply,
    SaveAsDefault,
    Cancel,
}

struct TranslatorApp {
    state: AppState,
    settings: Option<SettingsDraft>,
}

impl TranslatorApp {
    fn new(config: Config) -> Self {
        Self { state: AppState::new(config), settings: None }
    }

    fn open_settings(&mut self) {
        self.settings = Some(SettingsDraft {
            backend: self.state.config.backend,
            api_key: self.state.config.deepl_api_key.clone(),
            show_key: false,
        });
    }

    fn pick_document(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select File")
            .add_filter("Text Files", &["txt"])
            .add_filter("PDF Files", &["pdf"])
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            log::info!("Loading {}", path.display());
            self.state.load_document(&path);
        }
    }

    fn save_translation(&mut self) {
        if !self.state.require_output("Nothing to save") {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Save Translation")
            .add_filter("Text Files", &["txt"])
            .add_filter("All Files", &["*"])
            .set_file_name("translation.txt")
            .save_file()
        {
            if let Err(e) = self.state.save_output(&path) {
                log::error!("Could not save file: {e:#}");
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Warning)
                    .set_title("Error")
                    .set_description(format!("Could not save file: {e:#}"))
                    .show();
            }
        }
    }

    fn copy_translation(&mut self, ctx: &egui::Context) {
        if let Some(text) = self.state.copyable_output() {
            if !clipboard::write_string(&text) {
                ctx.output_mut(|o| o.copied_text = text);
            }
            self.state.mark_copied();
        }
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(format!("{} Translator Pro", icon::TRANSLATE));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("{} Settings", icon::GEAR)).clicked() {
                    self.open_settings();
                }
                ui.label(
                    egui::RichText::new(self.state.config.backend.display_name())
                        .small()
                        .weak(),
                );
            });
        });
    }

    fn language_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Source Language");
            language_combo(ui, "source_lang", &mut self.state.config.source_lang);
            if ui
                .button(icon::ARROWS_LEFT_RIGHT)
                .on_hover_text("Swap languages")
                .clicked()
            {
                self.state.swap_languages();
            }
            ui.label("Target Language");
            language_combo(ui, "target_lang", &mut self.state.config.target_lang);
        });
    }

    fn source_card(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong("Source Text");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(format!("{} Clear", icon::TRASH)).clicked() {
                        self.state.clear_source();
                    }
                    if ui.button(format!("{} Paste", icon::CLIPBOARD_TEXT)).clicked() {
                        self.state.paste_text(clipboard::read_string());
                    }
                    let open = egui::Button::new(format!("{} Open file", icon::FOLDER_OPEN));
                    if ui.add_enabled(!self.state.is_loading(), open).clicked() {
                        self.pick_document();
                    }
                    let file = self.state.loaded_file.as_deref().unwrap_or("No file selected");
                    ui.label(egui::RichText::new(file).weak());
                });
            });
            egui::ScrollArea::vertical()
                .id_source("source_scroll")
                .max_height(220.0)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let resp = ui.add(
                        egui::TextEdit::multiline(&mut self.state.source_text)
                            .hint_text(SOURCE_HINT)
                            .desired_rows(10)
                            .desired_width(f32::INFINITY),
                    );
                    if resp.changed() {
                        self.state.source_changed();
                    }
                });
        });
    }

    fn translate_row(&mut self, ui: &mut egui::Ui) {
        let busy = self.state.is_translating();
        ui.vertical_centered(|ui| {
            let label = if busy { "Translating..." } else { "Translate" };
            let button = egui::Button::new(format!("{} {}", icon::TRANSLATE, label))
                .min_size(egui::vec2(200.0, 34.0));
            if ui.add_enabled(!busy, button).clicked() {
                self.state.start_translation();
            }
        });
        if let Some(p) = self.state.progress() {
            ui.add(egui::ProgressBar::new(p as f32 / 100.0).show_percentage());
        }
    }

    fn output_card(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong("Translation");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(format!("{} Save", icon::FLOPPY_DISK)).clicked() {
                        self.save_translation();
                    }
                    if ui.button(format!("{} Copy", icon::COPY)).clicked() {
                        self.copy_translation(ctx);
                    }
                });
            });
            egui::ScrollArea::vertical()
                .id_source("output_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let mut text = self.state.output_text.as_str();
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .hint_text(OUTPUT_HINT)
                            .desired_rows(12)
                            .desired_width(f32::INFINITY),
                    );
                });
        });
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let Some(draft) = self.settings.as_mut() else {
            return;
        };
        let mut open = true;
        let action = show_settings(ctx, draft, &mut open);
        let action = if open { action } else { Some(SettingsAction::Cancel) };

        match action {
            Some(SettingsAction::Apply) => {
                self.state.apply_settings(draft.backend, draft.api_key.trim().to_string());
                self.settings = None;
            }
            Some(SettingsAction::SaveAsDefault) => {
                self.state.apply_settings(draft.backend, draft.api_key.trim().to_string());
                self.settings = None;
                match self.state.config.save() {
                    Ok(()) => self.state.flash_status("✓ Settings saved as default", Duration::from_secs(3)),
                    Err(e) => {
                        log::error!("Config save failed: {e:#}");
                        self.state.flash_status(format!("Could not save settings: {e}"), Duration::from_secs(4));
                    }
                }
            }
            Some(SettingsAction::Cancel) => self.settings = None,
            None => {}
        }
    }
}

fn language_combo(ui: &mut egui::Ui, id: &str, selected: &mut String) {
    egui::ComboBox::from_id_source(id)
        .selected_text(selected.as_str())
        .width(200.0)
        .show_ui(ui, |ui| {
            for (name, _) in LANGUAGES {
                ui.selectable_value(selected, name.to_string(), *name);
            }
        });
}

fn show_settings(ctx: &egui::Context, draft: &mut SettingsDraft, open: &mut bool) -> Option<SettingsAction> {
    let mut action = None;
    egui::Window::new("Translation Settings")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .open(open)
        .show(ctx, |ui| {
            ui.heading("Translation Backend Settings");
            ui.label("Choose your preferred translation service:");
            ui.add_space(8.0);
            ui.group(|ui| {
                for backend in Backend::ALL {
                    ui.radio_value(&mut draft.backend, backend, backend.display_name());
                    ui.label(egui::RichText::new(format!("   {}", backend.description())).small().weak());
                    ui.add_space(4.0);
                }
            });
            ui.add_space(8.0);
            ui.group(|ui| {
                ui.strong("DeepL API Configuration (Optional)");
                ui.horizontal(|ui| {
                    ui.label("API Key:");
                    ui.add(
                        egui::TextEdit::singleline(&mut draft.api_key)
                            .password(!draft.show_key)
                            .hint_text("Enter your DeepL API key")
                            .desired_width(300.0),
                    );
                    let eye = if draft.show_key { icon::EYE_SLASH } else { icon::EYE };
                    if ui.button(eye).on_hover_text("Show/hide key").clicked() {
                        draft.show_key = !draft.show_key;
                    }
                });
                if draft.backend.needs_api_key() && draft.api_key.trim().is_empty() {
                    ui.colored_label(ui.visuals().warn_fg_color, "DeepL needs an API key to translate.");
                }
            });
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Apply").clicked() {
                    action = Some(SettingsAction::Apply);
                }
                if ui.button("Save as default").clicked() {
                    action = Some(SettingsAction::SaveAsDefault);
                }
                if ui.button("Cancel").clicked() {
                    action = Some(SettingsAction::Cancel);
                }
            });
        });
    action
}

impl eframe::App for TranslatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll the worker channel even without user input.
        let changed = self.state.poll();
        self.state.tick(Instant::now());
        if changed || self.state.is_translating() || self.state.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(120));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            self.header(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.state.status());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(self.state.counter()).weak());
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(self.settings.is_none(), |ui| {
                self.language_row(ui);
                ui.add_space(8.0);
                self.source_card(ui);
                ui.add_space(8.0);
                self.translate_row(ui);
                ui.add_space(8.0);
                self.output_card(ui, ctx);
            });
        });

        self.settings_window(ctx);
    }
}

fn setup_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    let candidates = [
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\msyh.ttf",
        r"C:\Windows\Fonts\simsun.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/System/Library/Fonts/PingFang.ttc",
    ];
    let loaded = candidates.iter().find_map(|path| fs::read(path).ok().map(|bytes| (*path, bytes)));
    match loaded {
        Some((path, bytes)) => {
            fonts.font_data.insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                fonts.families.entry(family).or_default().push("cjk".to_owned());
            }
            log::info!("Loaded CJK fallback font: {}", path);
        }
        None => log::info!("No CJK font found; CJK text may render as squares"),
    }
    ctx.set_fonts(fonts);
    ctx.set_visuals(egui::Visuals::dark());
}

/// Runs the window on the calling thread until it is closed.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = TranslatorApp::new(config);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Translator Pro")
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };
    log::info!("Main UI: starting event loop");
    eframe::run_native(
        "Translator Pro",
        native_options,
        Box::new(|cc| {
            setup_fonts(&cc.egui_ctx);
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow!("window error: {e}"))?;
    log::info!("Main UI: event loop exited");
    Ok(())
}
