//! Command and callback handler implementations (/start, menu buttons)

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, ParseMode};

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::menu;
use foxcore::storage::db;
use foxcore::storage::get_connection;

/// Handle /start command
///
/// Registers the player (or refreshes `last_active` for a returning
/// one), then sends the welcome message with the main keyboard. The
/// referral bonus line appears only when the bonus was paid on this
/// exact start.
pub(super) async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    payload: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user_id = msg
        .from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(msg.chat.id.0);
    let username = msg.from.as_ref().and_then(|u| u.username.clone());
    let first_name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "друг".to_string());
    let referrer_id = parse_referral_payload(payload);

    let conn = get_connection(&deps.db_pool)?;
    let outcome = db::register_start(&conn, user_id, username.as_deref(), referrer_id, &deps.config.game)?;
    if outcome.created {
        log::info!(
            "New player on /start: user_id={}, referrer={:?}, bonus_granted={}",
            user_id,
            referrer_id,
            outcome.bonus_granted
        );
    }

    match db::get_user(&conn, user_id)? {
        Some(user) => {
            let bonus = outcome.bonus_granted.then_some(deps.config.game.referral_bonus);
            bot.send_message(msg.chat.id, menu::welcome_text(&first_name, &user, bonus))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::main_keyboard(&deps.config.miniapp_url))
                .await?;
        }
        None => {
            log::error!("User {} missing right after register_start", user_id);
            bot.send_message(msg.chat.id, "Что-то пошло не так. Попробуй /start ещё раз.")
                .await?;
        }
    }

    Ok(())
}

/// Handle a main-keyboard button press
///
/// The game buttons are informational for now; each press is
/// acknowledged so the client stops its spinner.
pub(super) async fn handle_menu_callback(bot: &Bot, q: &CallbackQuery) -> Result<(), HandlerError> {
    let notice = match q.data.as_deref() {
        Some(menu::callback::DAILY_BONUS) => "Ежедневный бонус скоро появится! 🎁",
        Some(menu::callback::STATS) => "Статистика скоро появится! 📊",
        Some(menu::callback::REFERRAL) => "Реферальные ссылки скоро появятся! 🤝",
        Some(menu::callback::AIRDROP) => "Airdrop уже близко, следи за новостями! 🔥",
        other => {
            log::warn!("Unknown callback data: {:?}", other);
            "Эта кнопка пока в разработке 🛠"
        }
    };

    bot.answer_callback_query(q.id.clone()).text(notice).await?;
    Ok(())
}

/// Parse the referral deep-link payload of `/start <referrer_id>`.
///
/// Anything that is not a decimal integer is treated as no referrer.
pub(crate) fn parse_referral_payload(payload: &str) -> Option<i64> {
    payload.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn referral_payload_parses_decimal_ids() {
        assert_eq!(parse_referral_payload("123456"), Some(123456));
        assert_eq!(parse_referral_payload("  42  "), Some(42));
    }

    #[test]
    fn referral_payload_rejects_garbage() {
        assert_eq!(parse_referral_payload(""), None);
        assert_eq!(parse_referral_payload("not-a-number"), None);
        assert_eq!(parse_referral_payload("12.5"), None);
        assert_eq!(parse_referral_payload("12 34"), None);
    }
}
