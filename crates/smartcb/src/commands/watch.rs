//! Watch command handler: poll readings and report breach transitions.
//!
//! Readings are printed as they arrive and forwarded to a
//! [`ReadingMonitor`] task; its breach events come back over a broadcast
//! channel. Structured formats emit one record per line.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use smartcb_core::{BreachEvent, BreachKind, Reading, ReadingMonitor, classify};

use super::{Context, util};
use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

const MIN_INTERVAL_MS: u64 = 250;
const READING_BUFFER: usize = 16;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Reading(&'a Reading),
    Breach(&'a BreachEvent),
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn reading(&self, ctx: &Context, reading: &Reading) -> Result<(), CliError> {
        let line = match self.format {
            OutputFormat::Table | OutputFormat::Plain => {
                let level = classify(reading, &ctx.manager.store().thresholds()).worst();
                format!(
                    "{}  {:>6.1} V  {:>6.2} A  {:>5.2} Hz  PF {:.2}  {:>7.1} W  relay {}  [{}]",
                    reading.timestamp.format("%H:%M:%S"),
                    reading.voltage,
                    reading.current,
                    reading.frequency,
                    reading.power_factor,
                    reading.power,
                    if reading.relay_on { "on" } else { "off" },
                    output::paint_level(level, self.color),
                )
            }
            _ => self.structured(&Record::Reading(reading))?,
        };
        output::print_output(&line, self.quiet);
        Ok(())
    }

    fn breach(&self, event: &BreachEvent) -> Result<(), CliError> {
        let line = match self.format {
            OutputFormat::Table | OutputFormat::Plain => match event.kind {
                BreachKind::Entered => format!(
                    "{}  breach entered: {} [{}]",
                    event.at.format("%H:%M:%S"),
                    event.assessment.flagged().join(", "),
                    output::paint_level(event.assessment.worst(), self.color),
                ),
                BreachKind::Cleared => {
                    format!("{}  breach cleared", event.at.format("%H:%M:%S"))
                }
            },
            _ => self.structured(&Record::Breach(event))?,
        };
        output::print_output(&line, self.quiet);
        Ok(())
    }

    fn structured(&self, record: &Record<'_>) -> Result<String, CliError> {
        match self.format {
            OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(record)?.trim_end())),
            _ => output::render_json_compact(record),
        }
    }
}

pub async fn handle(ctx: &Context, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::connect(ctx, global).await?;

    let printer = Printer {
        format: output::format(global),
        color: output::should_color(&global.color),
        quiet: global.quiet,
    };

    let monitor = ReadingMonitor::new(ctx.manager.store().clone());
    let mut events = monitor.subscribe();
    let (readings_tx, readings_rx) = mpsc::channel(READING_BUFFER);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(monitor.run(ReceiverStream::new(readings_rx), cancel.clone()));

    let mut ticker = tokio::time::interval(Duration::from_millis(
        args.interval_ms.max(MIN_INTERVAL_MS),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen: u64 = 0;
    loop {
        if args.count.is_some_and(|n| seen >= n) {
            break;
        }
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                cancel.cancel();
                break;
            }
            Ok(event) = events.recv() => printer.breach(&event)?,
            _ = ticker.tick() => match ctx.manager.read_current().await {
                Ok(reading) => {
                    seen += 1;
                    printer.reading(ctx, &reading)?;
                    if readings_tx.send(reading).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "reading failed"),
            },
        }
    }

    // Closing the stream lets the monitor finish the last reading.
    drop(readings_tx);
    task.await
        .map_err(|e| CliError::Internal(format!("monitor task failed: {e}")))?;
    while let Ok(event) = events.try_recv() {
        printer.breach(&event)?;
    }
    Ok(())
}
