use anyhow::{Result, bail};
use cibkit::wait;

use crate::Context;
use crate::cli::WaitCondition;
use crate::progress;

pub fn run(ctx: &Context, condition: &WaitCondition, fail_on_timeout: bool) -> Result<()> {
    let mut options = ctx.options.clone();
    options.retry_fail_on_timeout |= fail_on_timeout;
    let mut store = ctx.store_with(options, None);

    let what = describe(condition);
    let spinner = (!ctx.quiet).then(|| progress::spinner(&format!("Waiting for {what}")));

    let outcome = match condition {
        WaitCondition::Online => wait::wait_for_online(&mut store),
        WaitCondition::Status(args) => {
            wait::wait_for_status(&mut store, &args.primitive, args.node.as_deref())
        }
        WaitCondition::Start(args) => {
            wait::wait_for_start(&mut store, &args.primitive, args.node.as_deref())
        }
        WaitCondition::Stop(args) => {
            wait::wait_for_stop(&mut store, &args.primitive, args.node.as_deref())
        }
        WaitCondition::Master(args) => {
            wait::wait_for_master(&mut store, &args.primitive, args.node.as_deref())
        }
    };

    match (outcome, spinner) {
        (Ok(true), Some(pb)) => progress::finish_success(&pb, &format!("{what}: done")),
        (Ok(true), None) => {}
        (Ok(false), pb) => {
            if let Some(pb) = pb {
                progress::finish_warn(&pb, &format!("{what}: timed out"));
            }
            bail!("Timed out waiting for {what}");
        }
        (Err(e), pb) => {
            if let Some(pb) = pb {
                progress::finish_error(&pb, &format!("{what}: failed"));
            }
            return Err(e.into());
        }
    }
    Ok(())
}

fn describe(condition: &WaitCondition) -> String {
    let on_node = |node: &Option<String>| {
        node.as_ref()
            .map(|node| format!(" on {node}"))
            .unwrap_or_default()
    };
    match condition {
        WaitCondition::Online => "the cluster to come online".to_string(),
        WaitCondition::Status(args) => {
            format!("a known status of '{}'{}", args.primitive, on_node(&args.node))
        }
        WaitCondition::Start(args) => format!("'{}' to start{}", args.primitive, on_node(&args.node)),
        WaitCondition::Stop(args) => format!("'{}' to stop{}", args.primitive, on_node(&args.node)),
        WaitCondition::Master(args) => {
            format!("'{}' to run as master{}", args.primitive, on_node(&args.node))
        }
    }
}
