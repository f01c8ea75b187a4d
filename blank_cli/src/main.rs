//! # Blank CLI
//!
//! Terminal front end for the blank engine. Prompts for a model, the internal
//! dimensions and a flute, then prints the blank and its JSON report.
//!
//! ## Environment
//!
//! - `BLANK_CATALOG` - path to a semicolon-separated formula table
//!   (the bundled reference table is used when unset)
//! - `BLANK_SETTINGS` - optional JSON settings file
//! - `RUST_LOG` - log filter (default `warn`)

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use blank_core::{BlankEngine, BlankInput, EngineSettings, Flute, FormulaCatalog};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn prompt(prompt: &str, default: &str) -> String {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return default.to_string();
    }

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return default.to_string();
    }

    let input = input.trim();
    if input.is_empty() {
        default.to_string()
    } else {
        input.to_string()
    }
}

fn prompt_f64(text: &str, default: f64) -> f64 {
    prompt(text, &default.to_string()).replace(',', ".").parse().unwrap_or(default)
}

/// Flute code or a raw thickness in mm.
fn prompt_thickness(default: Flute) -> f64 {
    let codes: Vec<&str> = Flute::ALL.iter().map(Flute::code).collect();
    let answer = prompt(
        &format!("Flute ({}) or thickness in mm [{}]: ", codes.join("/"), default.code()),
        default.code(),
    );
    match Flute::from_code(&answer) {
        Some(flute) => flute.thickness_mm(),
        None => answer
            .replace(',', ".")
            .parse()
            .unwrap_or_else(|_| default.thickness_mm()),
    }
}

fn load_settings() -> EngineSettings {
    let Ok(path) = std::env::var("BLANK_SETTINGS") else {
        return EngineSettings::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(json) => EngineSettings::from_json(&json).unwrap_or_else(|e| {
            warn!("Ignoring settings file '{}': {}", path, e);
            EngineSettings::default()
        }),
        Err(e) => {
            warn!("Settings file '{}' could not be read: {}", path, e);
            EngineSettings::default()
        }
    }
}

fn load_catalog() -> Arc<FormulaCatalog> {
    match std::env::var("BLANK_CATALOG") {
        Ok(path) => FormulaCatalog::shared(path),
        Err(_) => Arc::new(FormulaCatalog::reference()),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("Blank Calculator - corrugated box blank sizes");
    println!("=============================================");
    println!();

    let catalog = load_catalog();
    if let Some(error) = catalog.load_error() {
        eprintln!("Warning: {}", error);
    }
    let engine = BlankEngine::new(catalog).with_settings(load_settings());

    let models = engine.available_models();
    if models.is_empty() {
        eprintln!("No models available - check BLANK_CATALOG.");
        std::process::exit(1);
    }
    println!("Available models: {}", models.join(", "));
    println!();

    let default_model = models.iter().find(|m| m.as_str() == "201").unwrap_or(&models[0]).clone();
    let model = prompt(&format!("Model [{}]: ", default_model), &default_model);
    let length = prompt_f64("Internal length L (mm) [300]: ", 300.0);
    let width = prompt_f64("Internal width W (mm) [200]: ", 200.0);
    let height = prompt_f64("Internal height H (mm) [150]: ", 150.0);
    let thickness = prompt_thickness(Flute::B);

    let input = BlankInput::new(model, length, width, height, thickness);

    match engine.compute_report(&input) {
        Ok(report) => {
            let blank = &report.dimensions;
            println!();
            println!("═══════════════════════════════════════");
            println!("  BLANK");
            println!("═══════════════════════════════════════");
            println!();
            println!("Input:");
            println!("  Model:     {} ({})", input.model, report.family);
            println!("  Internal:  {:.0} x {:.0} x {:.0} mm", length, width, height);
            println!("  Thickness: {:.1} mm", thickness);
            println!();
            println!("Result:");
            println!("  Profile:   {}", blank.profile_label);
            println!("  Blank:     {:.0} x {:.0} mm", blank.width, blank.height);
            println!("  Area:      {:.4} m²", blank.area_m2());
            if blank.estimated {
                println!("  [ESTIMATE] Not production-validated, check before cutting");
            }
            if !report.unresolved.is_empty() {
                println!();
                println!("Unresolved formulas ({}):", report.unresolved.len());
                for row in &report.unresolved {
                    println!("  {} = {}  ({})", row.parameter, row.formula, row.error);
                }
            }

            println!();
            println!("JSON Output:");
            if let Ok(json) = serde_json::to_string_pretty(&report) {
                println!("{}", json);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
        }
    }
}
