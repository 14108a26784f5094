use crate::commands::{
    create_error_embed, create_success_embed, create_warning_embed, CommandResult, Context,
};
use crate::components::calendar_sync::SyncOutcome;
use rust_i18n::t;
use tracing::error;

/// Sync the calendar feed into scheduled events now
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_EVENTS")]
pub async fn sync_calendar(ctx: Context<'_>) -> CommandResult {
    let title = t!("sync_title");

    let Some(handle) = ctx.data().component_manager.calendar_sync().await else {
        ctx.send(
            poise::CreateReply::default()
                .embed(create_warning_embed(&title, &t!("sync_not_configured")))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    // Passes can outlast the interaction token's initial window
    ctx.defer_ephemeral().await?;

    let embed = match handle.trigger().await {
        Ok(SyncOutcome::Completed(report)) => {
            let mut summary = t!(
                "sync_completed",
                entries = report.entries,
                created = report.created,
                updated = report.updated,
                deleted = report.deleted,
                unchanged = report.unchanged,
                skipped = report.skipped_past
            )
            .to_string();
            if report.failed > 0 {
                summary.push_str("\n\n");
                summary.push_str(&t!("sync_completed_with_failures", failed = report.failed));
                create_warning_embed(&title, &summary)
            } else {
                create_success_embed(&title, &summary)
            }
        }
        Ok(SyncOutcome::AlreadyRunning) => {
            create_warning_embed(&title, &t!("sync_already_running"))
        }
        Ok(SyncOutcome::Stopped) => create_warning_embed(&title, &t!("sync_stopped")),
        Err(e) => {
            error!("Manual calendar sync failed: {}", e);
            create_error_embed(&title, &t!("sync_failed", error = e.to_string()))
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
