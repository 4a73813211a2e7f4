use acls_core::config::SoundConfig;
use acls_core::*;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "acls")]
#[command(about = "ACLS resuscitation dose timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive timer (default)
    Run {
        /// Disable alert tones
        #[arg(long)]
        mute: bool,
    },

    /// Replay a scripted timeline against a virtual clock
    Replay {
        /// Scenario file (`MM:SS action` per line)
        script: PathBuf,

        /// Wall-clock time of offset 00:00, e.g. 2024-01-01T10:00:00 (default: now)
        #[arg(long)]
        start: Option<String>,

        /// Tick only on `tick` lines instead of on a fixed grid
        #[arg(long)]
        manual_ticks: bool,

        /// Sampler grid in seconds
        #[arg(long, default_value_t = 1)]
        sample_secs: u32,

        /// Output format (text, csv, json)
        #[arg(long, default_value = "text")]
        format: ExportFormat,

        /// Write the log to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Print the default config file path instead
        #[arg(long)]
        path: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    acls_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    match cli.command {
        Some(Commands::Run { mute }) => cmd_run(&config, mute),
        Some(Commands::Replay {
            script,
            start,
            manual_ticks,
            sample_secs,
            format,
            output,
        }) => {
            let clock = if manual_ticks {
                ReplayClock::Manual
            } else {
                ReplayClock::Every(sample_secs)
            };
            cmd_replay(&config, &script, start.as_deref(), clock, format, output)
        }
        Some(Commands::Config { path }) => cmd_config(&config, path),
        None => {
            // Default to "run" command
            cmd_run(&config, false)
        }
    }
}

// ============================================================================
// Interactive session
// ============================================================================

enum UiEvent {
    Tick,
    Input(String),
    InputClosed,
}

/// Action waiting for a `y` confirmation
#[derive(Clone, Copy, Debug)]
enum Pending {
    Dose(DoseKind),
    Shock,
    Reset,
    ClearLog,
}

enum Flow {
    Continue,
    Quit,
}

/// Terminal renderer for monitor callbacks
struct TerminalView {
    audio: Option<Sender<Beep>>,
    shown_entries: usize,
}

impl MonitorObserver for TerminalView {
    fn on_tick(&mut self, report: &TickReport) {
        let since_dose = report
            .since_dose
            .map(|s| format_mmss(u64::from(s)))
            .unwrap_or_else(|| "--:--".to_string());
        let display = report.status.display();
        print!(
            "\r總時間 {}  |  距上次給藥 {}  {}    ",
            format_mmss(u64::from(report.elapsed_total)),
            since_dose,
            display.label
        );
        if let Err(e) = io::stdout().flush() {
            tracing::warn!("Unable to refresh timer display: {}", e);
        }
    }

    fn on_log_changed(&mut self, entries: &[LogEntry]) {
        if entries.is_empty() {
            println!("\n紀錄已清除");
        } else {
            for entry in entries.iter().skip(self.shown_entries) {
                println!("\n{}", format_entry(entry));
            }
        }
        self.shown_entries = entries.len();
    }

    fn on_sound(&mut self, beep: Beep) {
        let Some(audio) = &self.audio else {
            return;
        };
        if audio.send(beep).is_err() {
            tracing::warn!("Audio thread unavailable, alert tones disabled");
            self.audio = None;
        }
    }
}

fn cmd_run(config: &Config, mute: bool) -> Result<()> {
    let (tx, rx) = channel();
    spawn_sampler(tx.clone(), config.sampler.interval());
    spawn_stdin_reader(tx);

    let audio = (config.sound.enabled && !mute).then(|| spawn_audio(config.sound.clone()));
    let view = TerminalView {
        audio,
        shown_entries: 0,
    };
    let mut monitor = Monitor::from_config(config, view);
    let mut pending = None;

    print_help();

    while let Ok(event) = rx.recv() {
        match event {
            UiEvent::Tick => {
                monitor.tick(Local::now());
            }
            UiEvent::Input(line) => {
                if let Flow::Quit = handle_input(&mut monitor, &mut pending, line.trim()) {
                    break;
                }
            }
            UiEvent::InputClosed => break,
        }
    }

    println!();
    Ok(())
}

fn handle_input<O: MonitorObserver>(
    monitor: &mut Monitor<O>,
    pending: &mut Option<Pending>,
    input: &str,
) -> Flow {
    let now = Local::now();

    if let Some(action) = pending.take() {
        if matches!(input.to_lowercase().as_str(), "y" | "yes") {
            apply(monitor, action, now);
        } else {
            println!("已取消");
        }
        return Flow::Continue;
    }

    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, Some(arg.trim())),
        None => (input, None),
    };

    match command.to_lowercase().as_str() {
        "e" => prompt_dose(monitor, pending, DoseKind::Epinephrine, now),
        "a" => prompt_dose(monitor, pending, DoseKind::Amiodarone, now),
        "s" => {
            *pending = Some(Pending::Shock);
            println!("確認執行 電擊 (Shock) ? [y/N]");
        }
        "r" => {
            *pending = Some(Pending::Reset);
            println!("確認結束急救並清除所有資料? [y/N]");
        }
        "c" => {
            if monitor.log().is_empty() {
                println!("尚無紀錄");
            } else {
                *pending = Some(Pending::ClearLog);
                println!("確認永久刪除所有歷史紀錄? [y/N]");
            }
        }
        "h" => print_history(monitor.log()),
        "x" => export(monitor, arg.filter(|a| !a.is_empty())),
        "q" => return Flow::Quit,
        "?" | "help" => print_help(),
        "" => {}
        other => println!("未知指令: {} (輸入 ? 查看說明)", other),
    }
    Flow::Continue
}

fn prompt_dose<O: MonitorObserver>(
    monitor: &mut Monitor<O>,
    pending: &mut Option<Pending>,
    kind: DoseKind,
    now: DateTime<Local>,
) {
    // Opening the dose prompt counts as the first interaction
    monitor.start_session(now);

    match monitor.dose_advisory(kind, now) {
        Some(early) => {
            println!("注意：未滿 {} 分鐘", early.minimum_secs / 60);
            println!(
                "距離上次給藥僅 {}",
                format_mmss(u64::from(early.since_last_secs))
            );
            println!("仍要強制給藥嗎？ [y/N]");
        }
        None => println!("確認給予 {} ? [y/N]", kind),
    }
    *pending = Some(Pending::Dose(kind));
}

fn apply<O: MonitorObserver>(monitor: &mut Monitor<O>, action: Pending, now: DateTime<Local>) {
    match action {
        Pending::Dose(kind) => monitor.give_dose(kind, now),
        Pending::Shock => {
            monitor.give_shock(now);
        }
        Pending::Reset => monitor.reset_session(now),
        Pending::ClearLog => {
            monitor.clear_log();
        }
    }
}

fn export<O: MonitorObserver>(monitor: &Monitor<O>, path: Option<&str>) {
    let Some(path) = path else {
        println!("\n{}", monitor.export_log_text());
        return;
    };

    let path = Path::new(path);
    match export_to_file(monitor, ExportFormat::for_path(path), path) {
        Ok(()) => println!("✓ 紀錄已匯出: {}", path.display()),
        Err(e) => {
            tracing::warn!("Export to {:?} failed: {}", path, e);
            println!("匯出失敗: {}", e);
        }
    }
}

fn print_history(log: &EventLog) {
    if log.is_empty() {
        println!("\n尚無紀錄");
        return;
    }
    println!();
    for entry in log.read_all() {
        println!("{}", format_entry(entry));
    }
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] ({}) {:<10} {}",
        entry.time_label(),
        entry.elapsed_label(),
        entry.category.name(),
        entry.description
    )
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  e  Epinephrine      a  Amiodarone");
    println!("  s  電擊 (Shock)     r  結束急救 (重置)");
    println!("  h  歷史紀錄         c  清除紀錄");
    println!("  x [path]  匯出紀錄  q  離開");
    println!("─────────────────────────────────────────");
}

fn spawn_sampler(tx: Sender<UiEvent>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if tx.send(UiEvent::Tick).is_err() {
            break;
        }
    });
}

fn spawn_stdin_reader(tx: Sender<UiEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(UiEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(UiEvent::InputClosed);
    });
}

/// Audio subsystem: plays queued tones one at a time on the terminal bell
fn spawn_audio(sound: SoundConfig) -> Sender<Beep> {
    let (tx, rx) = channel::<Beep>();
    thread::spawn(move || {
        let mut queue = ToneQueue::new();
        for beep in rx {
            queue.enqueue(beep, &sound);
            while let Some(tone) = queue.pop() {
                play_tone(&tone);
            }
        }
    });
    tx
}

fn play_tone(tone: &Tone) {
    tracing::debug!("Tone {} Hz for {:?}", tone.frequency_hz, tone.duration);
    let mut stderr = io::stderr();
    if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
        tracing::warn!("Unable to sound alert tone: {}", e);
    }
    thread::sleep(tone.duration + tone.gap_after);
}

// ============================================================================
// Replay
// ============================================================================

/// Prints alert transitions as the virtual clock advances
struct ReplayPrinter;

impl MonitorObserver for ReplayPrinter {
    fn on_tick(&mut self, report: &TickReport) {
        if let Some(beep) = report.beep {
            println!(
                "[{}] (+{}) BEEP x{} {}",
                report.at.format("%H:%M:%S"),
                format_mmss(u64::from(report.elapsed_total)),
                beep.count(),
                report.status.display().label
            );
        }
    }
}

fn cmd_replay(
    config: &Config,
    script: &Path,
    start: Option<&str>,
    clock: ReplayClock,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let scenario = Scenario::from_file(script)?;
    let origin = match start {
        Some(start) => parse_start(start)?,
        None => Local::now(),
    };

    let mut monitor = Monitor::from_config(config, ReplayPrinter);
    scenario.replay(&mut monitor, origin, clock);

    let rendered = acls_core::export::render(&monitor, format)?;
    match output {
        Some(path) => {
            write_atomic(&path, &rendered)?;
            println!("✓ Exported {} log entries to {}", monitor.log().len(), path.display());
        }
        None => {
            println!();
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn parse_start(s: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::Other(format!("Invalid --start {:?}: {}", s, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::Other(format!("--start {:?} does not exist locally", s)))
}

fn cmd_config(config: &Config, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", Config::default_config_path().display());
        return Ok(());
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    print!("{}", contents);
    Ok(())
}
