use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_stream::wrappers::IntervalStream;
use tracing::info;

use workflow_core::reactive::MutableProperty;
use workflow_core::{
    AnyWorkflowAction, HostConfig, HostEvent, RenderContext, Worker, Workflow, WorkflowHost,
};

/// Emits a tick at a fixed period. Equivalent when the period matches.
struct Ticker {
    period: Duration,
}

impl Worker for Ticker {
    type Output = ();

    fn run(&self) -> BoxStream<'static, ()> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        IntervalStream::new(interval).map(|_| ()).skip(1).boxed()
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        self.period == other.period
    }
}

/// Counts down and finishes with a message.
struct Countdown {
    from: u32,
    label: workflow_core::reactive::Property<String>,
}

impl Workflow for Countdown {
    type State = u32;
    type Output = String;
    type Rendering = String;
    type Storage = ();

    fn make_initial_state(&self) -> u32 {
        self.from
    }

    fn render(&self, remaining: &u32, context: &mut RenderContext<'_, Self>) -> String {
        let label = context.property_value(&self.label, "label");

        if *remaining > 0 {
            context.await_result(
                Ticker {
                    period: Duration::from_millis(200),
                },
                "tick",
                |()| {
                    AnyWorkflowAction::new(|remaining: &mut u32| {
                        *remaining -= 1;
                        (*remaining == 0).then(|| "liftoff".to_string())
                    })
                },
            );
        }

        format!("{label}: {remaining}")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = HostConfig::from_env()?;
    let label = MutableProperty::new("T-minus".to_string());

    let mut host = WorkflowHost::new(
        Countdown {
            from: 5,
            label: label.property(),
        },
        config,
    )?;
    info!(rendering = %host.rendering(), "Initial render");

    let mut relabeled = false;
    while let Some(event) = host.process_next().await {
        match event {
            HostEvent::Rendered => {
                info!(rendering = %host.rendering(), "Rendered");
                if !relabeled && host.rendering().ends_with(": 2") {
                    relabeled = true;
                    label.set("Almost".to_string());
                }
            }
            HostEvent::Output(message) => {
                info!(rendering = %host.rendering(), output = %message, "Finished");
                break;
            }
            HostEvent::Discarded => {}
        }
    }

    host.shutdown();
    Ok(())
}
