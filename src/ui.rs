// Interactive collection of the run's inputs, used only for whatever the
// command line did not supply. Uses `dialoguer` for single-line answers
// and plain stdin for pasted multi-paragraph prompts.

use std::io::{self, BufRead};

use anyhow::Result;
use dialoguer::{Confirm, Input, Password};

use crate::model::{parse_weight, PresetKind, ReferencePreset};

const RULE: &str = "========================================================";

pub fn banner(title: &str) {
    println!("{RULE}");
    println!("  {title}");
    println!("{RULE}");
}

/// Ask for the API key with hidden input.
pub fn ask_api_key() -> Result<String> {
    Ok(Password::new()
        .with_prompt("Fusara API key")
        .allow_empty_password(true)
        .interact()?)
}

/// Read pasted prompts from stdin until two consecutive empty lines or EOF.
pub fn ask_multiline_prompts() -> Result<Vec<String>> {
    println!("Paste prompts (each paragraph = one prompt).");
    println!("Finish with two empty lines:\n");
    let stdin = io::stdin();
    read_prompts(stdin.lock())
}

/// Split pasted text into prompts: paragraphs separated by blank lines,
/// lines inside a paragraph joined by a space.
pub fn read_prompts(input: impl BufRead) -> Result<Vec<String>> {
    let mut prompts = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut empties = 0;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            empties += 1;
            if !current.is_empty() {
                prompts.push(current.join(" "));
                current.clear();
            }
            if empties >= 2 {
                break;
            }
        } else {
            empties = 0;
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        prompts.push(current.join(" "));
    }
    Ok(prompts)
}

fn ask_text(prompt: &str) -> Result<String> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

/// Ask for the base image and each optional reference. Returns an empty
/// list when no base image URL is given.
pub fn ask_presets_interactive() -> Result<Vec<ReferencePreset>> {
    let base_url = ask_text("Base image URL (required for modify)")?;
    if base_url.is_empty() {
        return Ok(Vec::new());
    }

    let base = PresetKind::ImageRef;
    let raw = ask_text(&format!("Base image weight 0-100 [{}]", base.default_weight()))?;
    let mut presets = vec![ReferencePreset::new(
        base,
        Some(parse_weight(&raw, base.default_weight())),
        base_url,
    )];

    println!("\nOptional references (Enter to skip):");
    for kind in PresetKind::OPTIONAL {
        let url = ask_text(&format!("  {} URL", kind.label()))?;
        if url.is_empty() {
            continue;
        }
        let raw = ask_text(&format!(
            "  {} weight 0-100 [{}]",
            kind.label(),
            kind.default_weight()
        ))?;
        presets.push(ReferencePreset::new(
            kind,
            Some(parse_weight(&raw, kind.default_weight())),
            url,
        ));
    }
    Ok(presets)
}

pub fn confirm_run(mode: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!("Run {mode}?"))
        .default(true)
        .interact()?)
}
