use clap::{Args, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tally_analytics_funnels::FunnelService;
use tally_config::EditorLimits;
use tally_core::DatabaseConfig;
use tally_funnel_builder::{
    find_template, BasicMetadata, ConfirmDelete, EditorOptions, ForceDelete, FunnelEditor,
    FunnelStepDraft, TEMPLATES,
};
use tracing::info;

#[derive(Args)]
pub struct FunnelCommand {
    #[command(subcommand)]
    pub command: FunnelSubcommand,
}

#[derive(Subcommand)]
pub enum FunnelSubcommand {
    /// Create a funnel from a template
    Create(CreateFunnelCommand),
}

#[derive(Args)]
pub struct CreateFunnelCommand {
    /// Database connection URL
    #[arg(long, env = "TALLY_DATABASE_URL")]
    pub database_url: String,

    /// Template id or name
    #[arg(long)]
    pub template: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub target_audience: Option<String>,

    #[arg(long)]
    pub business_goal: Option<String>,

    /// Budget in whole currency units
    #[arg(long)]
    pub budget: Option<u64>,

    /// 1-based position of a template step to drop (repeatable)
    #[arg(long)]
    pub remove_step: Vec<usize>,

    /// Skip removal confirmations
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Defaults to 20
    #[arg(long, env = "TALLY_MAX_STEPS")]
    pub max_steps: Option<usize>,

    /// Defaults to 20
    #[arg(long, env = "TALLY_MAX_KEYWORDS")]
    pub max_keywords: Option<usize>,
}

impl FunnelCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            FunnelSubcommand::Create(create) => create.execute(),
        }
    }
}

/// Asks on a terminal before each removal
pub struct PromptConfirm<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    fn ask(&self, step: &FunnelStepDraft) -> io::Result<bool> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| io::Error::other("prompt lock poisoned"))?;
        let (input, output) = &mut *guard;

        loop {
            write!(
                output,
                "{} ",
                format!("Remove step '{}' ({})? (y/n):", step.name, step.tracked_event_name)
                    .bright_white()
                    .bold()
            )?;
            output.flush()?;

            let mut response = String::new();
            if input.read_line(&mut response)? == 0 {
                // EOF counts as no
                return Ok(false);
            }

            match response.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(output, "{}", "Please enter 'y' for yes or 'n' for no.".bright_white())?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ConfirmDelete for PromptConfirm<R, W> {
    fn confirm_delete(&self, step: &FunnelStepDraft) -> bool {
        self.ask(step).unwrap_or(false)
    }
}

impl CreateFunnelCommand {
    fn metadata(&self) -> BasicMetadata {
        BasicMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            target_audience: self.target_audience.clone(),
            business_goal: self.business_goal.clone(),
            budget: self.budget,
        }
    }

    /// Editor for the chosen template, with limits checked like the server's.
    pub fn editor(&self) -> anyhow::Result<FunnelEditor> {
        let template = find_template(&self.template).ok_or_else(|| {
            let known: Vec<&str> = TEMPLATES.iter().map(|t| t.id).collect();
            anyhow::anyhow!(
                "Unknown template '{}'. Available: {}",
                self.template,
                known.join(", ")
            )
        })?;

        let limits = EditorLimits::new(self.max_keywords, self.max_steps)?;
        let mut editor = FunnelEditor::new(EditorOptions {
            max_keywords: limits.max_keywords,
            max_steps: limits.max_steps,
        });
        editor.initialize(Some(template))?;
        Ok(editor)
    }

    pub fn execute(self) -> anyhow::Result<()> {
        // Incomplete details fail before any removal prompt
        let metadata = self.metadata();
        metadata.validate()?;

        let mut editor = self.editor()?;
        let removed = if self.yes {
            editor.remove_positions(&self.remove_step, &ForceDelete)?
        } else {
            let prompt = PromptConfirm::new(io::stdin().lock(), io::stdout());
            editor.remove_positions(&self.remove_step, &prompt)?
        };
        if removed > 0 {
            info!("Removed {} template steps", removed);
        }

        // Fail before connecting when the draft is incomplete
        editor.save_funnel(&metadata)?;

        let rt = tokio::runtime::Runtime::new()?;
        let stored = rt.block_on(async {
            let db = tally_database::establish_connection(&DatabaseConfig::new(
                self.database_url.clone(),
            ))
            .await?;
            let funnels = FunnelService::new(db);
            editor
                .persist(&metadata, &funnels)
                .await
                .map_err(anyhow::Error::from)
        })?;

        println!(
            "{} {} {}",
            "Created funnel".bright_green().bold(),
            stored.id.to_string().bright_cyan(),
            stored.name.bright_white()
        );
        for step in &stored.steps {
            println!("  {:>2}. {}", step.step_number, step.event_type);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Cursor;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        create: CreateFunnelCommand,
    }

    fn create(args: &[&str]) -> CreateFunnelCommand {
        let mut argv = vec![
            "tally",
            "--database-url",
            "sqlite::memory:",
            "--template",
            "trial-to-paid",
            "--name",
            "Trial",
        ];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().create
    }

    fn trial_editor() -> FunnelEditor {
        let mut editor = FunnelEditor::default();
        editor.initialize(find_template("trial-to-paid")).unwrap();
        editor
    }

    #[test]
    fn test_prompt_accepts_and_declines() {
        let editor = trial_editor();
        let step = editor.steps().next().unwrap();

        let prompt = PromptConfirm::new(Cursor::new("maybe\nyes\n"), Vec::new());
        assert!(prompt.confirm_delete(step));

        let prompt = PromptConfirm::new(Cursor::new("n\n"), Vec::new());
        assert!(!prompt.confirm_delete(step));

        let prompt = PromptConfirm::new(Cursor::new(""), Vec::new());
        assert!(!prompt.confirm_delete(step));
    }

    #[test]
    fn test_declined_removal_keeps_step() {
        let mut editor = trial_editor();
        let prompt = PromptConfirm::new(Cursor::new("no\n"), Vec::new());

        let removed = editor.remove_positions(&[2], &prompt).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(editor.len(), 10);
    }

    #[test]
    fn test_zero_step_limit_is_rejected() {
        let err = create(&["--max-steps", "0"]).editor().unwrap_err();
        assert!(err.to_string().contains("editor limits must be at least 1"));
    }

    #[test]
    fn test_template_longer_than_limit_is_rejected() {
        let err = create(&["--max-steps", "5"]).editor().unwrap_err();
        assert!(err.to_string().contains("at most 5 steps"));

        let editor = create(&["--max-keywords", "3"]).editor().unwrap();
        assert_eq!(editor.options().max_keywords, 3);
        assert_eq!(editor.options().max_steps, 20);
    }

    #[test]
    fn test_incomplete_details_fail_before_connecting() {
        let err = create(&["--yes"]).execute().unwrap_err();
        assert!(err.to_string().contains("target_audience"));
    }
}
