//! Number format codes.
//!
//! A format code is a small template language. It has up to four
//! `;`-separated sections: positive, negative, zero and text. A section can
//! start with bracketed modifiers: a color (`[Red]`), a condition (`[>100]`)
//! or a currency/locale tag (`[$€-407]`). Colors and locales are dropped;
//! conditions pick the section.
//!
//! Supported section bodies:
//! - `General`, optionally wrapped in literals
//! - digit placeholders `0 # ?` with `.`, thousands `,`, trailing scale `,`
//!   and `%`
//! - scientific `0.00E+00`
//! - fractions `# ?/?`, `# ??/16`
//! - dates and times `yyyy mm dd hh mm ss AM/PM`, elapsed `[h] [mm] [ss]`
//!   and fractional seconds `ss.000`
//! - text sections with `@`
//!
//! Anything else in a section is a literal.

/// Largest serial shown as a date: 9999-12-31.
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

/// Days between the 1900 and 1904 epochs.
const EPOCH_1904_OFFSET: i64 = 1_462;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Format code of a built-in `numFmtId` (ECMA-376 Part 1, 18.8.30).
pub const fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

/// Whether `code` renders numbers as dates or times.
pub fn is_date_format(code: &str) -> bool {
    NumberFormat::parse(code).is_date()
}

/// Render a number the way the General format does for typical values:
/// integers without a decimal point, others with up to 10 fractional
/// digits and no trailing zeros.
pub(crate) fn format_general(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{n:.0}");
    }
    let text = format!("{n:.10}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        return "0".to_string();
    }
    trimmed.to_string()
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Condition {
    op: Comparison,
    value: f64,
}

impl Condition {
    fn parse(text: &str) -> Option<Self> {
        let (op, rest) = [
            ("<=", Comparison::LessOrEqual),
            (">=", Comparison::GreaterOrEqual),
            ("<>", Comparison::NotEqual),
            ("<", Comparison::Less),
            (">", Comparison::Greater),
            ("=", Comparison::Equal),
        ]
        .into_iter()
        .find_map(|(prefix, op)| text.strip_prefix(prefix).map(|rest| (op, rest)))?;
        let value = rest.trim().parse().ok()?;
        Some(Self { op, value })
    }

    fn matches(&self, v: f64) -> bool {
        match self.op {
            Comparison::Less => v < self.value,
            Comparison::LessOrEqual => v <= self.value,
            Comparison::Greater => v > self.value,
            Comparison::GreaterOrEqual => v >= self.value,
            Comparison::Equal => (v - self.value).abs() < f64::EPSILON,
            Comparison::NotEqual => (v - self.value).abs() >= f64::EPSILON,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DatePart {
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    AmPm,
    AP,
    ElapsedHours,
    ElapsedMinutes,
    ElapsedSeconds,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(String),
    Digit(char),
    Point,
    Comma,
    Percent,
    Exponent { always_sign: bool },
    Slash,
    At,
    General,
    Date(DatePart),
}

impl Token {
    /// Text of a token that has no special meaning in the current section.
    fn literal_text(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::Digit(c) => c.to_string(),
            Self::Point => ".".to_string(),
            Self::Comma => ",".to_string(),
            Self::Percent => "%".to_string(),
            Self::Slash => "/".to_string(),
            Self::Exponent { always_sign: true } => "E+".to_string(),
            Self::Exponent { always_sign: false } => "E-".to_string(),
            Self::At | Self::General | Self::Date(_) => String::new(),
        }
    }
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

fn matches_at(chars: &[char], at: usize, word: &str) -> bool {
    word.chars()
        .enumerate()
        .all(|(k, w)| chars.get(at + k).is_some_and(|c| c.eq_ignore_ascii_case(&w)))
}

/// Length of the run of `c` (ignoring case) starting at `at`.
fn run_length(chars: &[char], at: usize, c: char) -> usize {
    chars
        .iter()
        .skip(at)
        .take_while(|ch| ch.eq_ignore_ascii_case(&c))
        .count()
}

/// Handle the inside of a `[...]` modifier.
fn bracket(inner: &str, tokens: &mut Vec<Token>, condition: &mut Option<Condition>) {
    let lower = inner.to_ascii_lowercase();
    let all = |c: char| !lower.is_empty() && lower.chars().all(|ch| ch == c);
    if all('h') {
        tokens.push(Token::Date(DatePart::ElapsedHours));
    } else if all('m') {
        tokens.push(Token::Date(DatePart::ElapsedMinutes));
    } else if all('s') {
        tokens.push(Token::Date(DatePart::ElapsedSeconds));
    } else if let Some(currency) = inner.strip_prefix('$') {
        let symbol = currency.split('-').next().unwrap_or_default();
        push_literal(tokens, symbol);
    } else if inner.starts_with(['<', '>', '=']) {
        *condition = Condition::parse(inner);
    }
    // Anything else is a color.
}

fn tokenize(section: &str) -> (Vec<Token>, Option<Condition>) {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut condition = None;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        i += 1;
        match c {
            '"' => {
                let text: String = chars.iter().skip(i).take_while(|&&ch| ch != '"').collect();
                i += text.chars().count() + 1;
                push_literal(&mut tokens, &text);
            }
            '\\' => {
                if let Some(next) = chars.get(i) {
                    push_literal(&mut tokens, &next.to_string());
                    i += 1;
                }
            }
            '_' => {
                // Space the width of the next character.
                i += 1;
                push_literal(&mut tokens, " ");
            }
            // Fill with the next character; there is no column width to fill.
            '*' => i += 1,
            '[' => {
                let inner: String = chars.iter().skip(i).take_while(|&&ch| ch != ']').collect();
                i += inner.chars().count() + 1;
                bracket(&inner, &mut tokens, &mut condition);
            }
            '0' | '#' | '?' => tokens.push(Token::Digit(c)),
            '.' => tokens.push(Token::Point),
            ',' => tokens.push(Token::Comma),
            '%' => tokens.push(Token::Percent),
            '/' => tokens.push(Token::Slash),
            '@' => tokens.push(Token::At),
            'E' | 'e' if matches!(chars.get(i), Some('+' | '-')) => {
                tokens.push(Token::Exponent {
                    always_sign: chars.get(i) == Some(&'+'),
                });
                i += 1;
            }
            'G' | 'g' if matches_at(&chars, i - 1, "general") => {
                tokens.push(Token::General);
                i += "general".len() - 1;
            }
            'A' | 'a' if matches_at(&chars, i - 1, "am/pm") => {
                tokens.push(Token::Date(DatePart::AmPm));
                i += "am/pm".len() - 1;
            }
            'A' | 'a' if matches_at(&chars, i - 1, "a/p") => {
                tokens.push(Token::Date(DatePart::AP));
                i += "a/p".len() - 1;
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let count = run_length(&chars, i - 1, c);
                i += count - 1;
                let part = match c.to_ascii_lowercase() {
                    'y' => DatePart::Year(count),
                    'm' => DatePart::Month(count),
                    'd' => DatePart::Day(count),
                    'h' => DatePart::Hour(count),
                    _ => DatePart::Second(count),
                };
                tokens.push(Token::Date(part));
            }
            other => push_literal(&mut tokens, &other.to_string()),
        }
    }

    resolve_minutes(&mut tokens);
    (tokens, condition)
}

/// `m`/`mm` right after an hour or right before a second means minutes.
fn resolve_minutes(tokens: &mut [Token]) {
    let parts: Vec<(usize, DatePart)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(i, t)| match t {
            Token::Date(p) => Some((i, *p)),
            _ => None,
        })
        .collect();

    for (k, (index, part)) in parts.iter().enumerate() {
        let DatePart::Month(count) = *part else {
            continue;
        };
        if count > 2 {
            continue;
        }
        let after_hour = k
            .checked_sub(1)
            .and_then(|prev| parts.get(prev))
            .is_some_and(|(_, p)| matches!(p, DatePart::Hour(_) | DatePart::ElapsedHours));
        let before_second = parts
            .get(k + 1)
            .is_some_and(|(_, p)| matches!(p, DatePart::Second(_) | DatePart::ElapsedSeconds));
        if after_hour || before_second {
            if let Some(token) = tokens.get_mut(*index) {
                *token = Token::Date(DatePart::Minute(count));
            }
        }
    }
}

/// Digit placeholders with the literals around them.
#[derive(Clone, Debug, Default, PartialEq)]
struct NumberPattern {
    prefix: String,
    suffix: String,
    int_zeros: usize,
    frac: Vec<char>,
    point: bool,
    grouping: bool,
    scale: i32,
    percent: i32,
}

impl NumberPattern {
    fn build(tokens: &[Token]) -> Self {
        let mut p = Self::default();
        let mut seen_digit = false;
        for (i, token) in tokens.iter().enumerate() {
            let next_is_digit = matches!(tokens.get(i + 1), Some(Token::Digit(_)));
            match token {
                Token::Digit(c) => {
                    seen_digit = true;
                    if p.point {
                        p.frac.push(*c);
                    } else if *c == '0' {
                        p.int_zeros += 1;
                    }
                }
                Token::Point if !p.point => p.point = true,
                Token::Comma if seen_digit && !p.point && next_is_digit => p.grouping = true,
                Token::Comma if seen_digit && !next_is_digit => p.scale += 1,
                Token::Percent => {
                    p.percent += 1;
                    p.literal(seen_digit, "%");
                }
                other => {
                    let text = other.literal_text();
                    p.literal(seen_digit, &text);
                }
            }
        }
        p
    }

    fn literal(&mut self, after_digits: bool, text: &str) {
        if after_digits {
            self.suffix.push_str(text);
        } else {
            self.prefix.push_str(text);
        }
    }

    /// Format a non-negative value. The flag is true when every shown digit
    /// is zero.
    fn format(&self, v: f64) -> (String, bool) {
        let decimals = self.frac.len();
        let scaled = round_half_away(
            v * 100f64.powi(self.percent) / 1000f64.powi(self.scale),
            decimals,
        );
        let text = format!("{scaled:.decimals$}");
        let is_zero = text.chars().all(|c| c == '0' || c == '.');
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut int_digits = if int_part == "0" && self.int_zeros == 0 {
            String::new()
        } else {
            int_part.to_string()
        };
        while int_digits.len() < self.int_zeros {
            int_digits.insert(0, '0');
        }
        if self.grouping {
            int_digits = group_thousands(&int_digits);
        }

        let mut frac: Vec<char> = frac_part.chars().collect();
        for placeholder in self.frac.iter().rev() {
            match (placeholder, frac.last().copied()) {
                ('#' | '?', Some('0')) => {
                    frac.pop();
                }
                _ => break,
            }
        }
        // `?` keeps the column width of a trimmed digit.
        let kept = frac.len();
        let padding = self
            .frac
            .iter()
            .skip(kept)
            .filter(|&&c| c == '?')
            .count();

        let mut out = String::with_capacity(self.prefix.len() + text.len() + self.suffix.len() + 4);
        out.push_str(&self.prefix);
        out.push_str(&int_digits);
        if self.point {
            out.push('.');
        }
        out.extend(frac);
        out.extend(std::iter::repeat(' ').take(padding));
        out.push_str(&self.suffix);
        (out, is_zero)
    }
}

/// Round halves away from zero at `decimals` places.
fn round_half_away(v: f64, decimals: usize) -> f64 {
    let Ok(places) = i32::try_from(decimals.min(15)) else {
        return v;
    };
    let factor = 10f64.powi(places);
    let rounded = (v * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        v
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq)]
struct ScientificPattern {
    prefix: String,
    suffix: String,
    decimals: usize,
    exp_width: usize,
    always_sign: bool,
}

impl ScientificPattern {
    fn build(tokens: &[Token]) -> Self {
        let mut p = Self::default();
        let mut seen_digit = false;
        let mut point = false;
        let mut exponent = false;
        for token in tokens {
            match token {
                Token::Digit(_) if exponent => p.exp_width += 1,
                Token::Digit(_) if point => p.decimals += 1,
                Token::Digit(_) => seen_digit = true,
                Token::Point if !exponent => point = true,
                Token::Exponent { always_sign } => {
                    exponent = true;
                    p.always_sign = *always_sign;
                }
                other if seen_digit => p.suffix.push_str(&other.literal_text()),
                other => p.prefix.push_str(&other.literal_text()),
            }
        }
        p.exp_width = p.exp_width.max(1);
        p
    }

    fn format(&self, v: f64) -> String {
        let decimals = self.decimals;
        let text = format!("{v:.decimals$e}");
        let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 {
            "-"
        } else if self.always_sign {
            "+"
        } else {
            ""
        };
        format!(
            "{}{mantissa}E{sign}{:0width$}{}",
            self.prefix,
            exp.unsigned_abs(),
            self.suffix,
            width = self.exp_width
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct FractionPattern {
    prefix: String,
    suffix: String,
    whole: bool,
    max_denominator: u32,
    fixed_denominator: Option<u32>,
}

impl FractionPattern {
    fn build(tokens: &[Token]) -> Self {
        let mut p = Self::default();
        let slash = tokens.iter().position(|t| *t == Token::Slash).unwrap_or(tokens.len());
        let (before, after) = tokens.split_at(slash);

        // Digits directly before the slash are the numerator; an earlier
        // digit group is the whole part.
        let numerator_start = before
            .iter()
            .rposition(|t| !matches!(t, Token::Digit(_)))
            .map_or(0, |i| i + 1);
        let (lead, _numerator) = before.split_at(numerator_start);
        p.whole = lead.iter().any(|t| matches!(t, Token::Digit(_)));
        let mut seen_digit = false;
        for token in lead {
            match token {
                Token::Digit(_) => seen_digit = true,
                // The separator between the whole part and the numerator.
                Token::Literal(_) if seen_digit => {}
                other => p.prefix.push_str(&other.literal_text()),
            }
        }

        let mut denominator_digits: u32 = 0;
        let mut fixed = String::new();
        for token in after.iter().skip(1) {
            match token {
                Token::Digit('0') if !fixed.is_empty() => fixed.push('0'),
                Token::Digit(_) if fixed.is_empty() => denominator_digits += 1,
                Token::Literal(text) if denominator_digits == 0 && fixed.is_empty() => {
                    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
                    fixed.push_str(&digits);
                    p.suffix.push_str(text.get(digits.len()..).unwrap_or_default());
                }
                other => p.suffix.push_str(&other.literal_text()),
            }
        }
        p.fixed_denominator = fixed.parse().ok().filter(|&d| d > 0);
        p.max_denominator = 10u32.pow(denominator_digits.clamp(1, 4)) - 1;
        p
    }

    fn format(&self, v: f64) -> String {
        let mut whole = if self.whole { v.trunc() } else { 0.0 };
        let (mut numerator, denominator) = match self.fixed_denominator {
            Some(d) => (((v - whole) * f64::from(d)).round(), f64::from(d)),
            None => best_fraction(v - whole, self.max_denominator),
        };
        if self.whole && (numerator - denominator).abs() < 0.5 {
            whole += 1.0;
            numerator = 0.0;
        }

        let mut out = self.prefix.clone();
        if self.whole {
            if numerator == 0.0 {
                out.push_str(&format!("{whole:.0}"));
            } else {
                if whole > 0.0 {
                    out.push_str(&format!("{whole:.0} "));
                }
                out.push_str(&format!("{numerator:.0}/{denominator:.0}"));
            }
        } else {
            out.push_str(&format!("{numerator:.0}/{denominator:.0}"));
        }
        out.push_str(&self.suffix);
        out
    }
}

/// Closest `n/d` to `x` with `d <= max_denominator`, smallest `d` on ties.
fn best_fraction(x: f64, max_denominator: u32) -> (f64, f64) {
    let mut best = (x.round(), 1.0);
    let mut best_error = (x - best.0).abs();
    for d in 2..=max_denominator {
        let d = f64::from(d);
        let n = (x * d).round();
        let error = (x - n / d).abs();
        if error + f64::EPSILON < best_error {
            best = (n, d);
            best_error = error;
        }
    }
    best
}

/// Calendar and clock fields of a date serial.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DateTime {
    year: i64,
    month: u32,
    day: u32,
    weekday: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
    total_seconds: i64,
}

fn jdn_to_ymd(jdn: i64) -> (i64, i64, i64) {
    let f = jdn + 1401 + (((4 * jdn + 274_277) / 146_097) * 3) / 4 - 38;
    let e = 4 * f + 3;
    let g = (e % 1461) / 4;
    let h = 5 * g + 2;
    let day = (h % 153) / 5 + 1;
    let month = ((h / 153 + 2) % 12) + 1;
    let year = e / 1461 - 4716 + (12 + 2 - month) / 12;
    (year, month, day)
}

impl DateTime {
    /// `None` for negative serials and serials past 9999-12-31.
    #[allow(clippy::cast_possible_truncation)]
    fn from_serial(serial: f64, date1904: bool, millis: bool) -> Option<Self> {
        let limit = if date1904 {
            MAX_DATE_SERIAL - 1462.0
        } else {
            MAX_DATE_SERIAL
        };
        if !(0.0..limit).contains(&serial) {
            return None;
        }

        // In range, so the product fits an i64.
        let total_ms = if millis {
            (serial * 86_400_000.0).round() as i64
        } else {
            (serial * 86_400.0).round() as i64 * 1000
        };
        let days = total_ms.div_euclid(86_400_000);
        let ms_of_day = total_ms.rem_euclid(86_400_000);

        let (year, month, day) = match (date1904, days) {
            (true, d) => jdn_to_ymd(d + 2_416_481),
            // Serial 0 is shown as the day before 1900-01-01 and serial 60
            // is the 1900-02-29 that never was.
            (false, 0) => (1900, 1, 0),
            (false, 60) => (1900, 2, 29),
            (false, d) if d < 60 => jdn_to_ymd(d + 2_415_020),
            (false, d) => jdn_to_ymd(d + 2_415_019),
        };
        let weekday = if date1904 {
            (days + 5).rem_euclid(7)
        } else {
            (days + 6).rem_euclid(7)
        };

        let field = |v: i64| u32::try_from(v).ok();
        Some(Self {
            year,
            month: field(month)?,
            day: field(day)?,
            weekday: field(weekday)?,
            hour: field(ms_of_day / 3_600_000)?,
            minute: field(ms_of_day / 60_000 % 60)?,
            second: field(ms_of_day / 1000 % 60)?,
            millis: field(ms_of_day % 1000)?,
            total_seconds: total_ms / 1000,
        })
    }
}

fn render_date(tokens: &[Token], serial: f64, date1904: bool) -> Option<String> {
    let subseconds = tokens
        .windows(2)
        .any(|w| matches!(w, [Token::Point, Token::Digit('0')]));
    let dt = DateTime::from_serial(serial, date1904, subseconds)?;
    let twelve_hour = tokens
        .iter()
        .any(|t| matches!(t, Token::Date(DatePart::AmPm | DatePart::AP)));
    let hour = if twelve_hour {
        match dt.hour % 12 {
            0 => 12,
            h => h,
        }
    } else {
        dt.hour
    };
    let month_name: &str = MONTHS.get(usize::try_from(dt.month).ok()?.checked_sub(1)?)?;
    let weekday_name: &str = WEEKDAYS.get(usize::try_from(dt.weekday).ok()?)?;

    let mut out = String::new();
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        match token {
            Token::Date(part) => match *part {
                DatePart::Year(n) if n <= 2 => out.push_str(&format!("{:02}", dt.year % 100)),
                DatePart::Year(_) => out.push_str(&format!("{:04}", dt.year)),
                DatePart::Month(1) => out.push_str(&dt.month.to_string()),
                DatePart::Month(2) => out.push_str(&format!("{:02}", dt.month)),
                DatePart::Month(3) => out.push_str(month_name.get(..3).unwrap_or(month_name)),
                DatePart::Month(4) => out.push_str(month_name),
                DatePart::Month(_) => out.push_str(month_name.get(..1).unwrap_or(month_name)),
                DatePart::Day(1) => out.push_str(&dt.day.to_string()),
                DatePart::Day(2) => out.push_str(&format!("{:02}", dt.day)),
                DatePart::Day(3) => out.push_str(weekday_name.get(..3).unwrap_or(weekday_name)),
                DatePart::Day(_) => out.push_str(weekday_name),
                DatePart::Hour(1) => out.push_str(&hour.to_string()),
                DatePart::Hour(_) => out.push_str(&format!("{hour:02}")),
                DatePart::Minute(1) => out.push_str(&dt.minute.to_string()),
                DatePart::Minute(_) => out.push_str(&format!("{:02}", dt.minute)),
                DatePart::Second(1) => out.push_str(&dt.second.to_string()),
                DatePart::Second(_) => out.push_str(&format!("{:02}", dt.second)),
                DatePart::AmPm => out.push_str(if dt.hour < 12 { "AM" } else { "PM" }),
                DatePart::AP => out.push(if dt.hour < 12 { 'A' } else { 'P' }),
                DatePart::ElapsedHours => out.push_str(&(dt.total_seconds / 3600).to_string()),
                DatePart::ElapsedMinutes => out.push_str(&(dt.total_seconds / 60).to_string()),
                DatePart::ElapsedSeconds => out.push_str(&dt.total_seconds.to_string()),
            },
            Token::Point if matches!(iter.peek(), Some(Token::Digit('0'))) => {
                let mut places = 0;
                while iter.next_if_eq(&&Token::Digit('0')).is_some() {
                    places += 1;
                }
                let millis = format!("{:03}", dt.millis);
                out.push('.');
                out.push_str(millis.get(..places.min(3)).unwrap_or(&millis));
            }
            other => out.push_str(&other.literal_text()),
        }
    }
    Some(out)
}

#[derive(Clone, Debug, PartialEq)]
enum Body {
    General { prefix: String, suffix: String },
    Number(NumberPattern),
    Scientific(ScientificPattern),
    Fraction(FractionPattern),
    Date(Vec<Token>),
    Text(Vec<Token>),
    Literal(String),
}

impl Body {
    fn classify(tokens: Vec<Token>) -> Self {
        let has = |f: fn(&Token) -> bool| tokens.iter().any(f);
        if has(|t| *t == Token::General) {
            let split = tokens.iter().position(|t| *t == Token::General).unwrap_or(0);
            let (before, after) = tokens.split_at(split);
            return Self::General {
                prefix: before.iter().map(Token::literal_text).collect(),
                suffix: after.iter().skip(1).map(Token::literal_text).collect(),
            };
        }
        if has(|t| matches!(t, Token::Date(_))) {
            return Self::Date(tokens);
        }
        if has(|t| *t == Token::At) {
            return Self::Text(tokens);
        }
        if !has(|t| matches!(t, Token::Digit(_))) {
            return Self::Literal(tokens.iter().map(Token::literal_text).collect());
        }
        if has(|t| matches!(t, Token::Exponent { .. })) {
            return Self::Scientific(ScientificPattern::build(&tokens));
        }
        if has(|t| *t == Token::Slash) {
            return Self::Fraction(FractionPattern::build(&tokens));
        }
        Self::Number(NumberPattern::build(&tokens))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Section {
    condition: Option<Condition>,
    body: Body,
}

impl Section {
    fn parse(code: &str) -> Self {
        let (tokens, condition) = tokenize(code);
        Self {
            condition,
            body: Body::classify(tokens),
        }
    }

    /// Format `v`, writing a leading minus when `signed` and `v` is negative.
    fn format(&self, v: f64, signed: bool, date1904: bool) -> String {
        let negative = signed && v < 0.0;
        let magnitude = v.abs();
        let (text, is_zero) = match &self.body {
            Body::General { prefix, suffix } => {
                (format!("{prefix}{}{suffix}", format_general(magnitude)), magnitude == 0.0)
            }
            Body::Number(pattern) => pattern.format(magnitude),
            Body::Scientific(pattern) => (pattern.format(magnitude), magnitude == 0.0),
            Body::Fraction(pattern) => (pattern.format(magnitude), magnitude == 0.0),
            Body::Date(tokens) => {
                return render_date(tokens, v, date1904).unwrap_or_else(|| format_general(v));
            }
            Body::Text(_) => return format_general(v),
            Body::Literal(text) => return text.clone(),
        };
        if negative && !is_zero {
            format!("-{text}")
        } else {
            text
        }
    }
}

/// Split on `;` outside quotes, escapes and brackets.
fn split_sections(code: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for (i, c) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            ';' if !in_quotes && !in_brackets => {
                sections.push(code.get(start..i).unwrap_or_default());
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(code.get(start..).unwrap_or_default());
    sections
}

/// A compiled number format code.
#[derive(Clone, Debug, PartialEq)]
pub struct NumberFormat {
    numeric: Vec<Section>,
    text: Option<Section>,
}

impl NumberFormat {
    pub fn parse(code: &str) -> Self {
        let mut numeric: Vec<Section> = split_sections(code).into_iter().map(Section::parse).collect();
        let text = if numeric.len() >= 4 {
            numeric.truncate(4);
            numeric.pop()
        } else if numeric.len() > 1 && matches!(numeric.last().map(|s| &s.body), Some(Body::Text(_))) {
            numeric.pop()
        } else {
            None
        };
        Self { numeric, text }
    }

    /// Whether the first section renders dates or times.
    pub fn is_date(&self) -> bool {
        matches!(self.numeric.first().map(|s| &s.body), Some(Body::Date(_)))
    }

    /// Format a numeric cell value.
    pub fn format_number(&self, value: f64, date1904: bool) -> String {
        if !value.is_finite() {
            return format_general(value);
        }
        let Some((section, signed)) = self.section_for(value) else {
            return format_general(value);
        };
        section.format(value, signed, date1904)
    }

    /// Format a text cell value through the text section, if any.
    pub fn format_text(&self, text: &str) -> String {
        let section = self.text.as_ref().or_else(|| {
            self.numeric
                .first()
                .filter(|s| matches!(s.body, Body::Text(_)))
        });
        match section.map(|s| &s.body) {
            Some(Body::Text(tokens)) => tokens
                .iter()
                .map(|t| match t {
                    Token::At => text.to_string(),
                    other => other.literal_text(),
                })
                .collect(),
            _ => text.to_string(),
        }
    }

    /// Section used for `v` and whether it shows a minus sign.
    fn section_for(&self, v: f64) -> Option<(&Section, bool)> {
        if self.numeric.iter().any(|s| s.condition.is_some()) {
            return self
                .numeric
                .iter()
                .find(|s| s.condition.map_or(true, |c| c.matches(v)))
                .map(|s| (s, true));
        }
        match self.numeric.as_slice() {
            [] => None,
            [only] => Some((only, true)),
            [positive, negative] => Some(if v < 0.0 {
                (negative, false)
            } else {
                (positive, true)
            }),
            [positive, negative, zero, ..] => Some(if v > 0.0 {
                (positive, true)
            } else if v < 0.0 {
                (negative, false)
            } else {
                (zero, true)
            }),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn fmt(value: f64, code: &str) -> String {
        NumberFormat::parse(code).format_number(value, false)
    }

    #[test_case(1234.5, "0" => "1235"; "integer rounds")]
    #[test_case(1234.5, "0.00" => "1234.50"; "fixed decimals")]
    #[test_case(1_234_567.891, "#,##0.00" => "1,234,567.89"; "thousands")]
    #[test_case(-1_234.5, "#,##0" => "-1,235"; "negative thousands")]
    #[test_case(0.256, "0%" => "26%"; "percent")]
    #[test_case(0.256, "0.00%" => "25.60%"; "percent decimals")]
    #[test_case(1.5, "#.##" => "1.5"; "optional decimals")]
    #[test_case(0.5, "#.00" => ".50"; "no integer zero")]
    #[test_case(7.0, "000" => "007"; "zero padding")]
    #[test_case(1_500_000.0, "#,##0.0,," => "1.5"; "trailing comma scales")]
    #[test_case(12.0, "\"Qty: \"0" => "Qty: 12"; "quoted prefix")]
    #[test_case(3.0, "0\\x" => "3x"; "escaped suffix")]
    #[test_case(-0.001, "0.00" => "0.00"; "negative rounding to zero drops sign")]
    fn numeric_formats(value: f64, code: &str) -> String {
        fmt(value, code)
    }

    #[test_case(1234.5, 5 => "$1,235 "; "currency")]
    #[test_case(-1234.5, 5 => "($1,235)"; "negative currency in parentheses")]
    #[test_case(-1234.5, 40 => "(1,234.50)"; "red negative keeps text")]
    #[test_case(12345.678, 11 => "1.23E+04"; "scientific")]
    #[test_case(0.000_123, 11 => "1.23E-04"; "small scientific")]
    #[test_case(1.5, 12 => "1 1/2"; "fraction")]
    #[test_case(0.333, 13 => "1/3"; "two digit fraction")]
    #[test_case(1234.0, 41 => " 1,234 "; "accounting")]
    #[test_case(0.0, 41 => " - "; "accounting zero")]
    fn builtin_formats(value: f64, id: u32) -> String {
        fmt(value, builtin_format(id).unwrap())
    }

    #[test_case(45000.0, "yyyy-mm-dd" => "2023-03-15"; "iso date")]
    #[test_case(45000.0, "mm-dd-yy" => "03-15-23"; "builtin short date")]
    #[test_case(45000.0, "d-mmm-yy" => "15-Mar-23"; "month abbreviation")]
    #[test_case(45000.0, "dddd, mmmm d" => "Wednesday, March 15"; "long names")]
    #[test_case(45000.75, "h:mm AM/PM" => "6:00 PM"; "twelve hour")]
    #[test_case(45000.5, "hh:mm:ss" => "12:00:00"; "time")]
    #[test_case(1.5, "[h]:mm:ss" => "36:00:00"; "elapsed hours")]
    #[test_case(0.000_5, "mm:ss.00" => "00:43.20"; "fractional seconds")]
    #[test_case(60.0, "yyyy-mm-dd" => "1900-02-29"; "leap year bug day")]
    #[test_case(61.0, "yyyy-mm-dd" => "1900-03-01"; "after the phantom day")]
    #[test_case(-1.0, "yyyy-mm-dd" => "-1"; "negative serial is not a date")]
    fn date_formats(value: f64, code: &str) -> String {
        fmt(value, code)
    }

    #[test]
    fn date1904_epoch() {
        let f = NumberFormat::parse("yyyy-mm-dd");
        assert_eq!(f.format_number(0.0, true), "1904-01-01");
        assert_eq!(f.format_number(45000.0 - 1462.0, true), "2023-03-15");
    }

    #[test]
    fn minutes_and_months_disambiguate() {
        assert_eq!(fmt(45000.0 + 5.0 / 1440.0, "m/d h:mm"), "3/15 0:05");
        assert_eq!(fmt(5.0 / 86_400.0 + 125.0 / 86_400.0, "mm:ss"), "02:10");
    }

    #[test]
    fn sections_pick_by_sign() {
        let f = NumberFormat::parse("0.0;[Red]-0.0\" neg\";\"zero\";\"text: \"@");
        assert_eq!(f.format_number(2.0, false), "2.0");
        assert_eq!(f.format_number(-2.0, false), "-2.0 neg");
        assert_eq!(f.format_number(0.0, false), "zero");
        assert_eq!(f.format_text("abc"), "text: abc");
    }

    #[test]
    fn conditions_pick_sections() {
        let f = NumberFormat::parse("[<1]0.00;[>=1000]#,##0,\"k\";0");
        assert_eq!(f.format_number(0.5, false), "0.50");
        assert_eq!(f.format_number(25_000.0, false), "25k");
        assert_eq!(f.format_number(12.0, false), "12");
    }

    #[test]
    fn text_without_text_section_is_unchanged() {
        assert_eq!(NumberFormat::parse("0.00").format_text("abc"), "abc");
        assert_eq!(NumberFormat::parse("@").format_text("abc"), "abc");
    }

    #[test]
    fn currency_locale_tags() {
        assert_eq!(fmt(3.5, "[$€-407]#,##0.00"), "€3.50");
        assert_eq!(fmt(3.5, "[$-409]0.0"), "3.5");
    }

    #[test]
    fn general_sections() {
        assert_eq!(fmt(1.25, "General"), "1.25");
        assert_eq!(fmt(3.0, "General\" units\""), "3 units");
        assert_eq!(format_general(-0.0), "0");
        assert_eq!(format_general(1.0 / 3.0), "0.3333333333");
    }

    #[test_case("yyyy-mm-dd" => true)]
    #[test_case("h:mm" => true)]
    #[test_case("[h]:mm:ss" => true)]
    #[test_case("0.00" => false)]
    #[test_case("\"day\" 0" => false)]
    #[test_case("[Red]#,##0" => false)]
    #[test_case("General" => false)]
    fn date_detection(code: &str) -> bool {
        is_date_format(code)
    }

    #[test]
    fn non_finite_values_fall_back_to_general() {
        assert_eq!(fmt(f64::NAN, "0.00"), "NaN");
    }
}
