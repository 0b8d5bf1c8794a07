//! Korean wording for currency amounts, as written on receipts and
//! invoices ("일금 일만 원정").

const DIGITS: [&str; 10] = ["", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];
const PLACES: [&str; 4] = ["", "십", "백", "천"];
/// One unit per group of four digits.
const GROUPS: [&str; 5] = ["", "만", "억", "조", "경"];

/// Spell out a four-digit group. A leading 1 is dropped before 십/백/천.
fn group_words(group: u64) -> String {
    let mut words = String::new();
    for place in (0..4).rev() {
        let digit = (group / 10u64.pow(place as u32) % 10) as usize;
        if digit == 0 {
            continue;
        }
        if digit != 1 || place == 0 {
            words.push_str(DIGITS[digit]);
        }
        words.push_str(PLACES[place]);
    }
    words
}

/// Format `amount` as `"일금 {words} 원정"`.
pub fn korean_amount(amount: u64) -> String {
    if amount == 0 {
        return "일금 영 원정".to_string();
    }

    let mut parts = Vec::new();
    let mut rest = amount;
    let mut unit = 0;
    while rest > 0 {
        let group = rest % 10_000;
        if group > 0 {
            parts.push(format!("{}{}", group_words(group), GROUPS[unit]));
        }
        rest /= 10_000;
        unit += 1;
    }
    parts.reverse();

    format!("일금 {} 원정", parts.concat())
}
