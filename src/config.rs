//! cli surface and the immutable engine configuration derived from it
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgMatches, Parser, ValueEnum};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::StrikeFuzzError;
use crate::filters::{FilterRule, FilterSet, ResponseAttr, RuleAction};
use crate::template::FuzzTemplate;

/// word-combination strategy selected on the cli
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// cartesian product of all word-lists; first list varies fastest
    #[default]
    Clusterbomb,

    /// one value per list per request; lists wrap independently
    Pitchfork,

    /// a single list supplies the same value to every placeholder
    Singular,
}

/// engine configuration, immutable after startup
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// request context pool size, i.e. the concurrency limit
    pub concurrency: usize,

    /// requests/second ceiling; 0 disables rate limiting
    pub rate: u64,

    /// per-request timeout enforced by the transport
    #[cfg_attr(feature = "serde", serde(skip))]
    pub timeout: Option<Duration>,

    /// inter-admission delay; equal bounds mean a fixed delay, unequal
    /// bounds a uniform-random one
    #[cfg_attr(feature = "serde", serde(skip))]
    pub delay: Option<(Duration, Duration)>,

    /// selected iteration mode
    pub mode: Mode,

    /// placeholder marker token
    pub marker: String,
}

/// command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "wordlist-driven http fuzzer", long_about = None)]
pub struct Args {
    /// target url template; may contain placeholder markers
    #[arg(short = 'u', long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// body parameter template, e.g. 'username=FUZZ'; repeatable
    #[arg(short = 'd', long = "data", value_name = "TEMPLATE")]
    pub data: Vec<String>,

    /// header template, e.g. 'X-Api-Key: FUZZ'; repeatable
    #[arg(short = 'H', long = "header", value_name = "TEMPLATE")]
    pub header: Vec<String>,

    /// word-list file backing the next placeholder; repeatable
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Vec<PathBuf>,

    /// word-combination strategy
    #[arg(short = 'm', long = "mode", value_enum, default_value = "clusterbomb")]
    pub mode: Mode,

    /// number of concurrent in-flight requests
    #[arg(short = 't', long = "concurrent", value_name = "N", default_value_t = 10)]
    pub concurrent: usize,

    /// requests/second ceiling; 0 means unlimited
    #[arg(short = 'R', long = "rate", value_name = "N", default_value_t = 0)]
    pub rate: u64,

    /// microseconds to pause between admissions: fixed `N` or uniform `LO-HI`
    #[arg(short = 'p', long = "delay", value_name = "MICROS")]
    pub delay: Option<String>,

    /// per-request timeout in seconds; 0 disables the timeout
    #[arg(short = 'T', long = "timeout", value_name = "SECONDS", default_value_t = 10.0)]
    pub timeout: f64,

    /// placeholder marker token substituted per request
    #[arg(long = "keyword", value_name = "TOKEN", default_value = "FUZZ")]
    pub keyword: String,

    /// filter out responses whose status code is in RANGE; repeatable
    #[arg(long = "fc", value_name = "RANGE")]
    pub filter_code: Vec<String>,

    /// only report responses whose status code is in RANGE; repeatable
    #[arg(long = "mc", value_name = "RANGE")]
    pub match_code: Vec<String>,

    /// filter out responses whose body size is in RANGE; repeatable
    #[arg(long = "fs", value_name = "RANGE")]
    pub filter_size: Vec<String>,

    /// only report responses whose body size is in RANGE; repeatable
    #[arg(long = "ms", value_name = "RANGE")]
    pub match_size: Vec<String>,

    /// filter out responses whose word count is in RANGE; repeatable
    #[arg(long = "fw", value_name = "RANGE")]
    pub filter_words: Vec<String>,

    /// only report responses whose word count is in RANGE; repeatable
    #[arg(long = "mw", value_name = "RANGE")]
    pub match_words: Vec<String>,

    /// filter out responses whose line count is in RANGE; repeatable
    #[arg(long = "fl", value_name = "RANGE")]
    pub filter_lines: Vec<String>,

    /// only report responses whose line count is in RANGE; repeatable
    #[arg(long = "ml", value_name = "RANGE")]
    pub match_lines: Vec<String>,

    /// filter out responses whose duration (ms) is in RANGE; repeatable
    #[arg(long = "fd", value_name = "RANGE")]
    pub filter_duration: Vec<String>,

    /// only report responses whose duration (ms) is in RANGE; repeatable
    #[arg(long = "md", value_name = "RANGE")]
    pub match_duration: Vec<String>,

    /// disable the implicit 200-399 status match applied when no rules are given
    #[arg(long = "no-default-match")]
    pub no_default_match: bool,
}

impl Args {
    /// convert parsed arguments into the engine's startup inputs
    ///
    /// # Errors
    ///
    /// returns an error when no url was provided, the url template is
    /// unparsable, or a delay/rule specification is malformed
    #[instrument(skip_all, level = "trace")]
    pub fn into_parts(
        self,
    ) -> Result<(EngineConfig, FuzzTemplate, Vec<PathBuf>, FilterSet), StrikeFuzzError> {
        let url = self.url.ok_or(StrikeFuzzError::MissingUrl)?;

        if self.keyword.is_empty() {
            // an empty token would "occur" at every character boundary
            return Err(StrikeFuzzError::InvalidParameter {
                param: self.keyword,
                message: "marker token must not be empty",
            });
        }

        // the raw template may hold markers in positions that break url
        // parsing; validate with each marker collapsed to a benign token
        let probe = url.replace(&self.keyword, "w");
        Url::parse(&probe).map_err(|source| StrikeFuzzError::InvalidUrl {
            source,
            url: url.clone(),
        })?;

        let mut template = FuzzTemplate::new(&url, &self.keyword);

        for param in &self.data {
            template.add_body_param(param);
        }

        for header in &self.header {
            template.add_header(header);
        }

        let delay = self.delay.as_deref().map(parse_delay).transpose()?;

        let timeout = if self.timeout > 0.0 {
            Some(Duration::from_secs_f64(self.timeout))
        } else {
            None
        };

        let config = EngineConfig {
            concurrency: self.concurrent.max(1),
            rate: self.rate,
            timeout,
            delay,
            mode: self.mode,
            marker: self.keyword,
        };

        let mut rules = Vec::new();

        let groups: [(&Vec<String>, ResponseAttr, RuleAction); 10] = [
            (&self.filter_code, ResponseAttr::Code, RuleAction::Filter),
            (&self.match_code, ResponseAttr::Code, RuleAction::Match),
            (&self.filter_size, ResponseAttr::Size, RuleAction::Filter),
            (&self.match_size, ResponseAttr::Size, RuleAction::Match),
            (&self.filter_words, ResponseAttr::Words, RuleAction::Filter),
            (&self.match_words, ResponseAttr::Words, RuleAction::Match),
            (&self.filter_lines, ResponseAttr::Lines, RuleAction::Filter),
            (&self.match_lines, ResponseAttr::Lines, RuleAction::Match),
            (
                &self.filter_duration,
                ResponseAttr::Duration,
                RuleAction::Filter,
            ),
            (
                &self.match_duration,
                ResponseAttr::Duration,
                RuleAction::Match,
            ),
        ];

        for (ranges, attr, action) in groups {
            for range in ranges {
                // each flag value may carry a comma-separated list of ranges
                for part in range.split(',') {
                    rules.push(FilterRule::parse(attr, action, part)?);
                }
            }
        }

        let filters = FilterSet::from_rules(rules, self.no_default_match);

        Ok((config, template, self.wordlist, filters))
    }
}

/// reorder `-w` values so each binds to the most recently declared
/// templated field on the command line
///
/// placeholders are consumed in scan order (url, then body parameters,
/// then headers), but a word-list flag belongs to whichever field was
/// declared last before it in argv. the raw flag positions carry that
/// pairing, so the caller hands in the [`ArgMatches`] the [`Args`] were
/// built from. a word-list with no preceding field declaration binds to
/// the url
#[must_use]
pub fn bind_wordlists(matches: &ArgMatches, wordlists: Vec<PathBuf>) -> Vec<PathBuf> {
    let Some(wordlist_positions) = matches.indices_of("wordlist") else {
        return wordlists;
    };

    // argv position of every templated-field declaration, tagged with the
    // field's scan rank
    let mut declarations: Vec<(usize, usize)> = Vec::new();
    let mut rank = 0;

    for id in ["url", "data", "header"] {
        if let Some(positions) = matches.indices_of(id) {
            for position in positions {
                declarations.push((position, rank));
                rank += 1;
            }
        } else if id == "url" {
            // keep body/header ranks stable even when no url was given
            rank += 1;
        }
    }

    let mut keyed: Vec<(usize, usize, PathBuf)> = wordlist_positions
        .zip(wordlists)
        .map(|(position, path)| {
            let bound = declarations
                .iter()
                .filter(|(declared, _)| *declared < position)
                .max_by_key(|(declared, _)| *declared)
                .map_or(0, |(_, rank)| *rank);

            (bound, position, path)
        })
        .collect();

    // stable: word-lists bound to the same field keep their argv order
    keyed.sort_by_key(|&(rank, position, _)| (rank, position));

    keyed.into_iter().map(|(_, _, path)| path).collect()
}

/// parse an inter-admission delay: fixed `N` or uniform-random `LO-HI`, in
/// microseconds
fn parse_delay(text: &str) -> Result<(Duration, Duration), StrikeFuzzError> {
    let parse_micros = |value: &str| {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_micros)
            .map_err(|_| StrikeFuzzError::InvalidParameter {
                param: text.to_string(),
                message: "delay must be `N` or `LO-HI` microseconds",
            })
    };

    let (low, high) = match text.split_once('-') {
        Some((low, high)) => (parse_micros(low)?, parse_micros(high)?),
        None => {
            let fixed = parse_micros(text)?;
            (fixed, fixed)
        }
    };

    if low > high {
        return Err(StrikeFuzzError::InvalidParameter {
            param: text.to_string(),
            message: "delay range is inverted",
        });
    }

    Ok((low, high))
}
