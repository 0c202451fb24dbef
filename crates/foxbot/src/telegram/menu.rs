//! Welcome message rendering and the main inline keyboard.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use url::Url;

use foxcore::storage::db::User;

/// Callback data for the main keyboard buttons.
pub mod callback {
    pub const DAILY_BONUS: &str = "daily_bonus";
    pub const STATS: &str = "stats";
    pub const REFERRAL: &str = "referral";
    pub const AIRDROP: &str = "airdrop";
}

/// Render the welcome message sent on every `/start` (HTML parse mode).
///
/// `referral_bonus` is `Some` only when the bonus was actually paid on
/// this start; the extra line is appended after the main text, matching
/// what players already know from the Mini App announcement channel.
pub fn welcome_text(first_name: &str, user: &User, referral_bonus: Option<i64>) -> String {
    let mut text = format!(
        "Привет, {}! 🦊\n\n\
         Добро пожаловать в <b>Fox Fury Tap</b>!\n\
         Тапай по хитрой лисе и фарми <b>FUR</b>!\n\n\
         Твой баланс: <b>{}</b> FUR\n\
         Энергия: <b>{}</b> / {}\n\
         Приглашено друзей: <b>{}</b>\n\n\
         Скоро будет airdrop и большой листинг! 🚀",
        first_name,
        format_thousands(user.fur),
        user.energy,
        user.max_energy,
        user.invited_count
    );

    if let Some(bonus) = referral_bonus {
        text.push_str(&format!("\n\nТебе +{} FUR за рефералку! 😎", bonus));
    }

    text
}

/// Build the main inline keyboard: the Mini App launcher plus the four
/// game buttons.
pub fn main_keyboard(miniapp_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::web_app(
            "🐾 Запустить Mini App!",
            WebAppInfo {
                url: miniapp_url.clone(),
            },
        )],
        vec![InlineKeyboardButton::callback(
            "Ежедневный бонус 🎁",
            callback::DAILY_BONUS,
        )],
        vec![InlineKeyboardButton::callback(
            "Мой баланс & Статистика",
            callback::STATS,
        )],
        vec![InlineKeyboardButton::callback(
            "Пригласить друзей (+бонус)",
            callback::REFERRAL,
        )],
        vec![InlineKeyboardButton::callback(
            "Скоро Airdrop 🔥",
            callback::AIRDROP,
        )],
    ])
}

/// Format an integer with comma thousands separators ("1234567" → "1,234,567").
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use teloxide::types::InlineKeyboardButtonKind;

    fn sample_user() -> User {
        User {
            user_id: 100,
            username: Some("foxplayer".to_string()),
            fur: 1500,
            energy: 998,
            max_energy: 1000,
            last_active: None,
            referrer_id: None,
            invited_count: 2,
            last_bonus_date: None,
        }
    }

    // ── format_thousands ─────────────────────────────────────────────────────

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(500), "500");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn format_thousands_keeps_sign() {
        assert_eq!(format_thousands(-1000), "-1,000");
    }

    // ── welcome_text ─────────────────────────────────────────────────────────

    #[test]
    fn welcome_text_shows_balances() {
        let text = welcome_text("Алиса", &sample_user(), None);
        assert!(text.contains("Привет, Алиса! 🦊"));
        assert!(text.contains("Твой баланс: <b>1,500</b> FUR"));
        assert!(text.contains("Энергия: <b>998</b> / 1000"));
        assert!(text.contains("Приглашено друзей: <b>2</b>"));
        assert!(!text.contains("за рефералку"), "no bonus line without a bonus");
    }

    #[test]
    fn welcome_text_appends_bonus_line_at_the_end() {
        let text = welcome_text("Боб", &sample_user(), Some(500));
        assert!(text.ends_with("Тебе +500 FUR за рефералку! 😎"));
        assert!(
            text.contains("большой листинг! 🚀\n\nТебе"),
            "bonus line goes after the main text"
        );
    }

    // ── main_keyboard ────────────────────────────────────────────────────────

    #[test]
    fn main_keyboard_has_five_rows_starting_with_the_miniapp() {
        let url = Url::parse("https://fox-fury-miniapp.vercel.app").unwrap();
        let keyboard = main_keyboard(&url);

        assert_eq!(keyboard.inline_keyboard.len(), 5, "one button per row");
        assert!(
            matches!(
                keyboard.inline_keyboard[0][0].kind,
                InlineKeyboardButtonKind::WebApp(_)
            ),
            "first row must open the Mini App"
        );
        assert_eq!(keyboard.inline_keyboard[1][0].text, "Ежедневный бонус 🎁");
        assert_eq!(keyboard.inline_keyboard[4][0].text, "Скоро Airdrop 🔥");
    }

    #[test]
    fn callback_buttons_carry_expected_data() {
        let url = Url::parse("https://fox-fury-miniapp.vercel.app").unwrap();
        let keyboard = main_keyboard(&url);

        let data: Vec<_> = keyboard
            .inline_keyboard
            .iter()
            .skip(1)
            .filter_map(|row| match &row[0].kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            data,
            vec![
                callback::DAILY_BONUS,
                callback::STATS,
                callback::REFERRAL,
                callback::AIRDROP
            ]
        );
    }
}
