// Command-line surface and the decisions that turn arguments (plus any
// interactive answers) into the list of requests for one run.

use std::path::PathBuf;

use anyhow::Result;

use crate::api::DEFAULT_BASE_URL;
use crate::config::{API_KEY_ENV, BASE_URL_ENV};
use crate::error::TaskError;
use crate::model::{
    build_requests, GenerationRequest, ImageCount, Mode, Model, PresetKind, ReferencePreset,
    ReferenceUrls,
};

/// Batch image generator for the Fusara imaging API (Qwen / Seedream).
#[derive(Debug, clap::Parser)]
#[command(version)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = Model::Qwen)]
    pub model: Model,

    #[arg(long, value_enum, default_value_t = Mode::Modify)]
    pub mode: Mode,

    /// API key (falls back to FUSARA_API_KEY, then the saved config)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Prompt, one task per prompt (repeatable)
    #[arg(long = "prompt")]
    pub prompts: Vec<String>,

    /// Base image URL (required for modify unless entered interactively)
    #[arg(long)]
    pub base_image: Option<String>,

    #[arg(long = "style-ref")]
    pub style_refs: Vec<String>,

    #[arg(long = "char-ref")]
    pub char_refs: Vec<String>,

    #[arg(long = "contour-ref")]
    pub contour_refs: Vec<String>,

    #[arg(long = "depth-ref")]
    pub depth_refs: Vec<String>,

    #[arg(long = "composition-ref")]
    pub composition_refs: Vec<String>,

    /// Images per prompt, clamped to 1..=4
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub num: i64,

    /// Output directory [default: ~/Desktop/fusara_output]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Do not ask for confirmation before submitting
    #[arg(short, long)]
    pub yes: bool,

    /// Seconds between status polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Seconds to wait for one task before giving up
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
}

impl Cli {
    pub fn env_api_key() -> Option<String> {
        std::env::var(API_KEY_ENV).ok()
    }

    /// Prompts given on the command line, blanks removed.
    pub fn prompt_list(&self) -> Vec<String> {
        self.prompts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn reference_urls(&self) -> ReferenceUrls {
        ReferenceUrls {
            base_image: self.base_image.clone(),
            style: self.style_refs.clone(),
            character: self.char_refs.clone(),
            contour: self.contour_refs.clone(),
            depth: self.depth_refs.clone(),
            composition: self.composition_refs.clone(),
        }
    }
}

/// What a run should do once every input has been gathered.
#[derive(Debug)]
pub enum RunPlan {
    NoPrompts,
    /// A local check failed; nothing may be sent.
    Rejected(TaskError),
    Ready {
        requests: Vec<GenerationRequest>,
        references: usize,
    },
}

impl Cli {
    /// Presets from the arguments. In modify mode without a base image the
    /// references are asked for interactively, and any argument references
    /// follow the answers.
    pub fn collect_presets(
        &self,
        ask: impl FnOnce() -> Result<Vec<ReferencePreset>>,
    ) -> Result<Vec<ReferencePreset>> {
        let presets = self.reference_urls().into_presets();
        let has_base = presets.iter().any(|p| p.kind == PresetKind::ImageRef);
        if self.mode == Mode::Create || has_base {
            return Ok(presets);
        }
        let mut asked = ask()?;
        asked.extend(presets);
        Ok(asked)
    }

    /// Gather prompts and presets, falling back to the given interactive
    /// collectors, and check every request before anything is sent.
    pub fn plan_run(
        &self,
        ask_prompts: impl FnOnce() -> Result<Vec<String>>,
        ask_presets: impl FnOnce() -> Result<Vec<ReferencePreset>>,
    ) -> Result<RunPlan> {
        let mut prompts = self.prompt_list();
        if prompts.is_empty() {
            prompts = ask_prompts()?;
        }
        if prompts.is_empty() {
            return Ok(RunPlan::NoPrompts);
        }

        let presets = self.collect_presets(ask_presets)?;
        let requests = build_requests(
            &prompts,
            self.model,
            self.mode,
            ImageCount::clamped(self.num),
            &presets,
        );
        if let Err(e) = requests.iter().try_for_each(GenerationRequest::validate) {
            return Ok(RunPlan::Rejected(e));
        }
        Ok(RunPlan::Ready {
            requests,
            references: presets.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["fusara-modify", "--base-url", "http://localhost:1"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn no_prompts() -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn not_asked() -> Result<Vec<ReferencePreset>> {
        panic!("references should come from the arguments")
    }

    fn interactive_base() -> Result<Vec<ReferencePreset>> {
        Ok(vec![ReferencePreset::new(
            PresetKind::ImageRef,
            Some(70),
            "https://img/typed.png",
        )])
    }

    #[test]
    fn create_mode_keeps_argument_references() -> Result<()> {
        let cli = parse(&["--mode", "create", "--prompt", "p", "--style-ref", "https://img/s.png"]);
        match cli.plan_run(no_prompts, not_asked)? {
            RunPlan::Ready { requests, references } => {
                assert_eq!(references, 1);
                assert_eq!(
                    requests[0].presets,
                    vec![ReferencePreset::new(PresetKind::StyleRef, None, "https://img/s.png")]
                );
            }
            other => panic!("unexpected plan: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn argument_base_image_skips_interactive_collection() -> Result<()> {
        let cli = parse(&["--prompt", "p", "--base-image", "https://img/b.png"]);
        let plan = cli.plan_run(no_prompts, not_asked)?;
        assert!(matches!(plan, RunPlan::Ready { references: 1, .. }));
        Ok(())
    }

    #[test]
    fn modify_without_base_asks_and_keeps_argument_references() -> Result<()> {
        let cli = parse(&["--prompt", "p", "--depth-ref", "https://img/d.png"]);
        let presets = cli.collect_presets(interactive_base)?;
        let kinds: Vec<_> = presets.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PresetKind::ImageRef, PresetKind::DepthRef]);
        assert_eq!(presets[0].weight, 70);
        Ok(())
    }

    #[test]
    fn empty_interactive_base_is_rejected_before_sending() -> Result<()> {
        let cli = parse(&["--prompt", "p", "--style-ref", "https://img/s.png"]);
        let plan = cli.plan_run(no_prompts, || Ok(Vec::new()))?;
        assert!(matches!(plan, RunPlan::Rejected(TaskError::Precondition(_))));
        Ok(())
    }

    #[test]
    fn one_request_per_prompt() -> Result<()> {
        let cli = parse(&[
            "--prompt",
            "one",
            "--prompt",
            "two",
            "--base-image",
            "https://img/b.png",
        ]);
        let plan = cli.plan_run(no_prompts, not_asked)?;
        assert!(matches!(plan, RunPlan::Ready { ref requests, .. } if requests.len() == 2));
        Ok(())
    }

    #[test]
    fn missing_prompts_stop_the_run() -> Result<()> {
        let cli = parse(&["--base-image", "https://img/b.png"]);
        assert!(matches!(cli.plan_run(no_prompts, not_asked)?, RunPlan::NoPrompts));
        Ok(())
    }

    #[test]
    fn pasted_prompts_are_used_when_none_given() -> Result<()> {
        let cli = parse(&["--base-image", "https://img/b.png", "--num", "0"]);
        let plan = cli.plan_run(|| Ok(vec!["pasted".to_string()]), not_asked)?;
        match plan {
            RunPlan::Ready { requests, .. } => {
                assert_eq!(requests[0].prompt, "pasted");
                assert_eq!(requests[0].image_count.get(), 1);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn repeated_flags_collect() {
        let cli = Cli::try_parse_from([
            "fusara-modify",
            "--model",
            "seedream",
            "--prompt",
            "first",
            "--prompt",
            "  ",
            "--prompt",
            "second",
            "--base-image",
            "https://img/base.png",
            "--style-ref",
            "https://img/s1.png",
            "--style-ref",
            "https://img/s2.png",
            "--num",
            "9",
        ])
        .unwrap();
        assert_eq!(cli.model, Model::Seedream);
        assert_eq!(cli.mode, Mode::Modify);
        assert_eq!(cli.prompt_list(), vec!["first", "second"]);
        assert_eq!(cli.reference_urls().into_presets().len(), 3);
        assert_eq!(cli.num, 9);
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["fusara-modify", "--base-url", "http://localhost:1"]).unwrap();
        assert_eq!(cli.model, Model::Qwen);
        assert_eq!(cli.num, 1);
        assert_eq!(cli.poll_interval, 5);
        assert_eq!(cli.timeout, 300);
        assert!(cli.prompt_list().is_empty());
        assert!(!cli.yes);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
