//! CLI (Command Line Interface) mode
//!
//! Interactive REPL that runs the same assessment pipeline as the WhatsApp
//! bot. Media is attached by writing a file path in brackets, e.g.
//! `Here is my work [samples/stitch.jpg]`.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use sa_core::{AssessmentPipeline, MediaPayload, UserInput};
use sa_whatsapp::format::{assessment_report, decision_emoji};
use tracing::info;

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show help"),
    ("/exit", "Exit the program"),
    ("/quit", "Exit the program"),
    ("/reset", "Forget the last image"),
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "avif"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Custom prompt with colored styling
struct ColoredPrompt {
    style: Style,
}

impl ColoredPrompt {
    fn new() -> Self {
        Self {
            style: Color::Cyan.bold(),
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.style.paint("💼 User: ").to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Audio,
}

/// A `[path]` reference found in an input line
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaReference {
    path: String,
    kind: MediaKind,
}

/// Split `text [path] more` into the remaining query and a media reference.
/// Paths with unknown extensions are dropped from the query but not loaded.
fn parse_media_reference(line: &str) -> (String, Option<MediaReference>) {
    let Some(start) = line.find('[') else {
        return (line.trim().to_string(), None);
    };
    let Some(len) = line[start..].find(']') else {
        return (line.trim().to_string(), None);
    };
    let end = start + len;

    let path = line[start + 1..end].trim().to_string();
    let query = format!("{}{}", &line[..start], &line[end + 1..])
        .trim()
        .to_string();

    let reference = media_kind(&path).map(|kind| MediaReference { path, kind });
    (query, reference)
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

fn media_kind(path: &str) -> Option<MediaKind> {
    let ext = extension(path)?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}

fn mime_for_path(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

fn is_exit(input: &str) -> bool {
    matches!(
        input.to_lowercase().as_str(),
        "exit" | "quit" | "bye" | "/exit" | "/quit"
    )
}

/// Run CLI interactive mode
pub async fn run_cli(pipeline: AssessmentPipeline) -> anyhow::Result<()> {
    info!(
        "Starting CLI mode with sub-agents: {:?}",
        pipeline.registry().names()
    );

    print_welcome(&pipeline);

    let mut keybindings = default_keybindings();

    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let prompt = ColoredPrompt::new();

    // Most recent image, reused when a later request needs one
    let mut last_image: Option<MediaPayload> = None;

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();

                if input.is_empty() {
                    println!("Please enter your message or type 'exit' to quit.");
                    continue;
                }

                if is_exit(input) {
                    println!("\n👋 Thank you for using the Job Assessment System. Goodbye!\n");
                    break;
                }

                if handle_command(input, &mut last_image) {
                    continue;
                }

                let Some(user_input) = load_input(input, &mut last_image).await else {
                    continue;
                };

                println!("\n🤖 Processing your request...");
                let mut stdout = std::io::stdout();
                if let Err(e) =
                    run_assessment(&pipeline, &user_input, last_image.as_ref(), &mut stdout).await
                {
                    eprintln!("\n{} {}", Color::Red.paint("❌ An error occurred:"), e);
                    eprintln!("Please try again or type 'exit' to quit.");
                }

                println!("\n{}", "-".repeat(50));
                println!("Ready for your next interaction!");
            }
            Ok(Signal::CtrlC) => {
                println!("\n\n👋 Session interrupted. Goodbye!");
                break;
            }
            Ok(Signal::CtrlD) => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            Err(err) => {
                eprintln!("\n❌ Error: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(
        KeyModifiers::CONTROL,
        KeyCode::Char('c'),
        ReedlineEvent::CtrlC,
    );
    keybindings.add_binding(
        KeyModifiers::CONTROL,
        KeyCode::Char('d'),
        ReedlineEvent::CtrlD,
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

/// Handle slash commands; returns true when the input was consumed
fn handle_command(input: &str, last_image: &mut Option<MediaPayload>) -> bool {
    let lower = input.to_lowercase();

    match lower.as_str() {
        "/reset" => {
            *last_image = None;
            println!("\n✅ Forgot the last image.\n");
            true
        }
        "/help" => {
            print_help();
            true
        }
        _ if lower.starts_with('/') => {
            eprintln!("\n❓ Unknown command: {}. Use /help to list commands.\n", input);
            true
        }
        _ => false,
    }
}

/// Read any referenced media file; `None` means the line was rejected
async fn load_input(line: &str, last_image: &mut Option<MediaPayload>) -> Option<UserInput> {
    let (query, reference) = parse_media_reference(line);
    let mut input = UserInput::text(query);

    let Some(reference) = reference else {
        return Some(input);
    };

    let label = match reference.kind {
        MediaKind::Image => "Image",
        MediaKind::Audio => "Audio",
    };

    let bytes = match tokio::fs::read(&reference.path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("❌ Error: {} file not found at '{}'.", label, reference.path);
            return None;
        }
        Err(e) => {
            eprintln!("❌ Error reading {} file '{}': {}", label.to_lowercase(), reference.path, e);
            return None;
        }
    };

    let media = MediaPayload::new(mime_for_path(&reference.path), bytes);
    println!("Loaded {} from: {}", label.to_lowercase(), reference.path);

    match reference.kind {
        MediaKind::Image => {
            *last_image = Some(media.clone());
            input = input.with_image(media);
        }
        MediaKind::Audio => input = input.with_audio(media),
    }
    Some(input)
}

/// Plan, delegate and judge, printing each step to `out`
async fn run_assessment(
    pipeline: &AssessmentPipeline,
    input: &UserInput,
    fallback_image: Option<&MediaPayload>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let plan = pipeline.plan(input).await?;
    writeln!(out, "\n🎯 Assessment Agent: {}", plan.response_or("..."))?;

    if !plan.has_instructions() {
        return Ok(());
    }

    let image = input.image.as_ref().or(fallback_image);
    if image.is_none() {
        writeln!(out, "\n📸 No image attached. Add one with [path/to/photo.jpg].")?;
    }

    let mut reports = Vec::with_capacity(plan.sub_agent_instructions.len());
    for instruction in &plan.sub_agent_instructions {
        writeln!(
            out,
            "\n🔍 Executing {} Assessment...",
            instruction.task_context.skill()
        )?;
        reports.push(pipeline.delegate_one(instruction, image).await);
    }

    let Some(role) = plan.target_role() else {
        writeln!(
            out,
            "\n❌ System Error: Could not determine role from assessment plan."
        )?;
        return Ok(());
    };

    writeln!(out, "\n🤔 Analyzing results for {} position...", role)?;
    let verdict = pipeline.verdict(role, &reports).await?;

    if let Some(assessment) = reports.iter().find_map(|r| r.result.assessment()) {
        writeln!(out, "\n{}", assessment_report(&assessment))?;
    }

    writeln!(
        out,
        "\n{} Final Decision: {}",
        decision_emoji(verdict.decision()),
        verdict.response_or("...")
    )?;
    Ok(())
}

/// Print welcome message
fn print_welcome(pipeline: &AssessmentPipeline) {
    let roles = pipeline.master().knowledge().roles().join(", ");

    println!();
    println!("🎯 Welcome to the Job Skill Assessment System!");
    println!("{}", "=".repeat(50));
    println!("Currently available role: {}", roles);
    println!("Usage examples:");
    println!("  'I want to apply for Tailor position' - Will ask for image");
    println!("  'Here is my work [test_stitch.jpg]' - Provide image with query");
    println!("  'Listen to this [intro.ogg]' - Provide a voice note");
    println!("Type 'exit' or 'quit' to end the session");
    println!("{}", "=".repeat(50));
}

/// Print help message
fn print_help() {
    println!();
    println!("📖 Available commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!(
        "💡 Attach media with [path]. Images: {}. Audio: {}.",
        IMAGE_EXTENSIONS.join(", "),
        AUDIO_EXTENSIONS.join(", ")
    );
    println!();
}
