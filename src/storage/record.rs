use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};

use crate::{
    tracker::{session::Session, splits::Split},
    utils::time::{format_clock, parse_clock},
};

const SESSION_HEADER: &str = "\"Session Title\",\"Session Description\",\"Total Time\"";
const SPLIT_HEADER: &str = "\"Split Number\",\"Split Time\",\"Total Time\",\"Description\"";

/// The on-disk form of a saved session. One file per session, fixed comma-delimited
/// layout:
///
/// ```text
/// "Session Title","Session Description","Total Time"
/// Morning Run,easy pace,00:42:07.123
/// "Split Number","Split Time","Total Time","Description"
/// 1,00:20:00.000,00:20:00.000,first half
/// 2,00:22:07.123,00:42:07.123,second half
/// ```
///
/// Durations use the fixed `HH:MM:SS.mmm` form. Fields containing commas, quotes, or
/// newlines are quoted with `""` escaping so free-text descriptions survive the trip;
/// the parser accepts quoted and bare fields alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub title: String,
    pub description: String,
    pub total: Duration,
    pub splits: Vec<SplitRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecord {
    pub number: usize,
    pub delta: Duration,
    pub total: Duration,
    pub description: String,
}

impl SessionRecord {
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(SESSION_HEADER);
        out.push('\n');
        push_row(
            &mut out,
            &[&self.title, &self.description, &format_clock(self.total)],
        );
        out.push_str(SPLIT_HEADER);
        out.push('\n');
        for split in &self.splits {
            push_row(
                &mut out,
                &[
                    &split.number.to_string(),
                    &format_clock(split.delta),
                    &format_clock(split.total),
                    &split.description,
                ],
            );
        }
        out
    }

    pub fn parse(text: &str) -> Result<SessionRecord> {
        let mut rows = parse_rows(text)?.into_iter();

        let header = rows.next().context("missing session header row")?;
        ensure!(
            header.len() == 3,
            "session header has {} columns, expected 3",
            header.len()
        );

        let data = rows.next().context("missing session data row")?;
        let [title, description, total]: [String; 3] = data
            .try_into()
            .map_err(|v: Vec<String>| anyhow!("session row has {} columns, expected 3", v.len()))?;
        let total =
            parse_clock(&total).with_context(|| format!("bad total duration `{total}`"))?;

        let split_header = rows.next().context("missing split header row")?;
        ensure!(
            split_header.len() == 4,
            "split header has {} columns, expected 4",
            split_header.len()
        );

        let mut splits = Vec::new();
        for row in rows {
            let [number, delta, split_total, description]: [String; 4] =
                row.try_into().map_err(|v: Vec<String>| {
                    anyhow!("split row has {} columns, expected 4", v.len())
                })?;
            let number = number
                .parse::<usize>()
                .with_context(|| format!("bad split number `{number}`"))?;
            let delta =
                parse_clock(&delta).with_context(|| format!("bad split duration `{delta}`"))?;
            let split_total = parse_clock(&split_total)
                .with_context(|| format!("bad split total `{split_total}`"))?;
            splits.push(SplitRecord {
                number,
                delta,
                total: split_total,
                description,
            });
        }

        Ok(SessionRecord {
            title,
            description,
            total,
            splits,
        })
    }

    pub fn into_session(self) -> Session {
        Session {
            title: self.title,
            description: self.description,
            total: self.total,
            splits: self
                .splits
                .into_iter()
                .map(|split| Split {
                    number: split.number,
                    delta: split.delta,
                    total: split.total,
                    description: split.description,
                })
                .collect(),
        }
    }
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        SessionRecord {
            title: session.title.clone(),
            description: session.description.clone(),
            total: session.total,
            splits: session
                .splits
                .iter()
                .map(|split| SplitRecord {
                    number: split.number,
                    delta: split.delta,
                    total: split.total,
                    description: split.description.clone(),
                })
                .collect(),
        }
    }
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push('\n');
}

fn push_field(out: &mut String, value: &str) {
    if value.contains(['"', ',', '\n', '\r']) {
        out.push('"');
        for c in value.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(value);
    }
}

/// Splits the whole record into rows of fields. Quoting has to be handled over the full
/// text, not per line, because quoted descriptions may contain newlines.
fn parse_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                c => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => quoted = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            c => field.push(c),
        }
    }
    if quoted {
        bail!("unterminated quoted field");
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::storage::record::{SessionRecord, SplitRecord};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sample() -> SessionRecord {
        SessionRecord {
            title: "Morning Run".into(),
            description: "easy pace".into(),
            total: ms(150),
            splits: vec![
                SplitRecord {
                    number: 1,
                    delta: ms(100),
                    total: ms(100),
                    description: "warmup".into(),
                },
                SplitRecord {
                    number: 2,
                    delta: ms(50),
                    total: ms(150),
                    description: "main".into(),
                },
            ],
        }
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(
            sample().encode(),
            "\"Session Title\",\"Session Description\",\"Total Time\"\n\
             Morning Run,easy pace,00:00:00.150\n\
             \"Split Number\",\"Split Time\",\"Total Time\",\"Description\"\n\
             1,00:00:00.100,00:00:00.100,warmup\n\
             2,00:00:00.050,00:00:00.150,main\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let record = sample();
        assert_eq!(SessionRecord::parse(&record.encode()).unwrap(), record);
    }

    #[test]
    fn test_round_trip_awkward_descriptions() {
        let mut record = sample();
        record.description = "pace, with \"quotes\"".into();
        record.splits[0].description = "line one\nline two".into();
        record.splits[1].description = String::new();
        assert_eq!(SessionRecord::parse(&record.encode()).unwrap(), record);
    }

    #[test]
    fn test_round_trip_no_splits() {
        let record = SessionRecord {
            title: "Empty".into(),
            description: String::new(),
            total: Duration::ZERO,
            splits: vec![],
        };
        assert_eq!(SessionRecord::parse(&record.encode()).unwrap(), record);
    }

    #[test]
    fn test_parse_rejects_wrong_column_count() {
        let text = "\"Session Title\",\"Session Description\",\"Total Time\"\n\
                    only two,columns\n";
        let err = SessionRecord::parse(text).unwrap_err();
        assert!(err.to_string().contains("expected 3"), "{err}");

        let text = "\"Session Title\",\"Session Description\",\"Total Time\"\n\
                    t,d,00:00:00.000\n\
                    \"Split Number\",\"Split Time\",\"Total Time\",\"Description\"\n\
                    1,00:00:00.000,00:00:00.000\n";
        let err = SessionRecord::parse(text).unwrap_err();
        assert!(err.to_string().contains("expected 4"), "{err}");
    }

    #[test]
    fn test_parse_rejects_bad_durations() {
        let text = "\"Session Title\",\"Session Description\",\"Total Time\"\n\
                    t,d,twelve minutes\n";
        assert!(SessionRecord::parse(text).is_err());

        let text = "\"Session Title\",\"Session Description\",\"Total Time\"\n\
                    t,d,00:00:00.000\n\
                    \"Split Number\",\"Split Time\",\"Total Time\",\"Description\"\n\
                    one,00:00:00.000,00:00:00.000,desc\n";
        assert!(SessionRecord::parse(text).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_record() {
        assert!(SessionRecord::parse("").is_err());
        assert!(SessionRecord::parse("\"Session Title\",\"Session Description\",\"Total Time\"\n").is_err());
    }
}
