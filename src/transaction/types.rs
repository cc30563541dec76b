use sha2::{Digest, Sha256};
use std::fmt;

/// Field separator inside a record line.
pub const SEPARATOR: char = '>';

/// One `source>amount>target>extra` line. An empty `source` marks a reward
/// (coinbase) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub source: String,
    pub amount: u64,
    pub target: String,
    pub extra: String,
}

impl Record {
    pub fn transfer(
        source: impl Into<String>,
        amount: u64,
        target: impl Into<String>,
        extra: impl Into<String>,
    ) -> Self {
        Record {
            source: source.into(),
            amount,
            target: target.into(),
            extra: extra.into(),
        }
    }

    pub fn reward(amount: u64, target: impl Into<String>, extra: impl Into<String>) -> Self {
        Record::transfer("", amount, target, extra)
    }

    pub fn is_reward(&self) -> bool {
        self.source.is_empty()
    }

    /// Parse a single line. Anything other than exactly four fields with a
    /// non-negative integer amount is rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(SEPARATOR);
        let source = fields.next()?;
        let amount = fields.next()?;
        let target = fields.next()?;
        let extra = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        let amount = amount.trim().parse::<u64>().ok()?;
        Some(Record::transfer(source, amount, target, extra))
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.source,
            self.amount,
            self.target,
            self.extra,
            sep = SEPARATOR
        )
    }

    /// Stable content fingerprint: SHA-256 over the length-prefixed fields.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for field in [
            self.source.as_bytes(),
            self.amount.to_string().as_bytes(),
            self.target.as_bytes(),
            self.extra.as_bytes(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        Fingerprint(hasher.finalize().into())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Outcome of reading one line of a block's `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Malformed(&'a str),
    Record(Record),
}

/// Split block info into lines and parse each one.
pub fn parse_lines(info: &str) -> impl Iterator<Item = Line<'_>> {
    info.split('\n').map(|line| {
        if line.trim().is_empty() {
            Line::Blank
        } else {
            match Record::parse(line) {
                Some(record) => Line::Record(record),
                None => Line::Malformed(line),
            }
        }
    })
}

/// Only the records of `info`, malformed lines dropped.
pub fn parse_records(info: &str) -> impl Iterator<Item = Record> + '_ {
    parse_lines(info).filter_map(|line| match line {
        Line::Record(record) => Some(record),
        _ => None,
    })
}
