use crate::config::{SessionSettings, MAX_ANSWER_LENGTH, MIN_ANSWER_LENGTH};
use crate::state::Context;

const VALID_KEYS: &str = "`refine`, `recursive`, `max_answer_length`, `show_confidence`";

/// View or change your session settings
#[poise::command(slash_command, guild_only)]
pub async fn settings(
    ctx: Context<'_>,
    #[description = "refine | recursive | max_answer_length | show_confidence"]
    param: Option<String>,
    #[description = "New value (on/off, or a number for max_answer_length)"] value: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let session = ctx.data().sessions.get(ctx.author().id.get()).await;
    let mut session = session.lock().await;

    match (param.as_deref(), value.as_deref()) {
        (None, _) => {
            let engine_note = if ctx.data().engine.is_loaded() {
                ""
            } else {
                "\n_QA engine loads on first question._"
            };
            ctx.say(format!("{}{}", describe(&session.settings), engine_note))
                .await?;
        }
        (Some(key), Some(val)) => {
            let reply = match apply_setting(&mut session.settings, key, val) {
                Ok(msg) | Err(msg) => msg,
            };
            ctx.say(reply).await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/docqa settings refine on`")
                .await?;
        }
    }

    Ok(())
}

fn describe(settings: &SessionSettings) -> String {
    format!(
        "**Session settings:**\n\
         `refine`: {}\n\
         `recursive`: {}\n\
         `max_answer_length`: {}\n\
         `show_confidence`: {}",
        on_off(settings.refine),
        on_off(settings.recursive),
        settings.max_answer_length,
        on_off(settings.show_confidence)
    )
}

/// Apply one setting. Both arms carry the message to show the user.
fn apply_setting(settings: &mut SessionSettings, key: &str, value: &str) -> Result<String, String> {
    match key {
        "refine" => {
            settings.refine = parse_bool(value)?;
            Ok(format!("`refine` set to {}", on_off(settings.refine)))
        }
        "recursive" => {
            settings.recursive = parse_bool(value)?;
            let mut msg = format!("`recursive` set to {}", on_off(settings.recursive));
            if settings.recursive && !settings.refine {
                msg.push_str(" (takes effect once `refine` is on)");
            }
            Ok(msg)
        }
        "max_answer_length" => {
            let len: usize = value
                .trim()
                .parse()
                .map_err(|_| format!("`{}` is not a number", value))?;
            let applied = settings.set_max_answer_length(len);
            if applied == len {
                Ok(format!("`max_answer_length` set to {}", applied))
            } else {
                Ok(format!(
                    "`max_answer_length` set to {} (allowed range {}-{})",
                    applied, MIN_ANSWER_LENGTH, MAX_ANSWER_LENGTH
                ))
            }
        }
        "show_confidence" => {
            settings.show_confidence = parse_bool(value)?;
            Ok(format!("`show_confidence` set to {}", on_off(settings.show_confidence)))
        }
        _ => Err(format!("Unknown param `{}`. Valid: {}", key, VALID_KEYS)),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("`{}` is not on/off", value)),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
