//! Peer client-fingerprint classification.
//!
//! Every peer in a swarm self-reports a client identification string
//! (its fingerprint). This module decides, for one observed peer and
//! one policy snapshot, whether that peer should be banned.
//!
//! The known-offender fingerprints are kept as declarative pattern
//! tables, one per category, walked in fixed precedence order:
//!
//! 1. **Leech** - aggressive leech clients (the Xunlei lineage)
//! 2. **Player** - P2P streaming players that download without seeding
//! 3. **Other** - miscellaneous offenders (download accelerators etc.)
//!
//! A pattern is a needle plus a match kind (prefix or substring) and a
//! case mode. A category matches when any of its patterns matches and
//! none of its exemptions does; the first matching enabled category
//! wins and later categories are not consulted.
//!
//! Classification is a pure function of the observation and the
//! policy. All logging happens at the call site.

/// Fingerprint categories, in ban-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Aggressive leech clients.
    Leech,
    /// Known P2P player clients.
    Player,
    /// Miscellaneous offender clients.
    Other,
}

impl Category {
    /// Human-readable label used in ban log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Leech => "leech client",
            Category::Player => "P2P player",
            Category::Other => "misc offender",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MatchKind {
    Prefix,
    Substring,
}

#[derive(Debug, Clone, Copy)]
enum CaseMode {
    Sensitive,
    Insensitive,
}

/// One entry of a category's pattern table.
#[derive(Debug, Clone, Copy)]
struct FingerprintPattern {
    needle: &'static str,
    kind: MatchKind,
    case: CaseMode,
}

impl FingerprintPattern {
    fn matches(&self, fingerprint: &str) -> bool {
        match (self.kind, self.case) {
            (MatchKind::Prefix, CaseMode::Sensitive) => fingerprint.starts_with(self.needle),
            (MatchKind::Prefix, CaseMode::Insensitive) => fingerprint
                .get(..self.needle.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(self.needle)),
            (MatchKind::Substring, CaseMode::Sensitive) => fingerprint.contains(self.needle),
            (MatchKind::Substring, CaseMode::Insensitive) => fingerprint
                .to_ascii_lowercase()
                .contains(&self.needle.to_ascii_lowercase()),
        }
    }
}

const fn prefix(needle: &'static str) -> FingerprintPattern {
    FingerprintPattern {
        needle,
        kind: MatchKind::Prefix,
        case: CaseMode::Sensitive,
    }
}

const fn prefix_ci(needle: &'static str) -> FingerprintPattern {
    FingerprintPattern {
        needle,
        kind: MatchKind::Prefix,
        case: CaseMode::Insensitive,
    }
}

const fn substring(needle: &'static str) -> FingerprintPattern {
    FingerprintPattern {
        needle,
        kind: MatchKind::Substring,
        case: CaseMode::Sensitive,
    }
}

/// Pattern table for one category.
struct CategoryTable {
    category: Category,
    patterns: &'static [FingerprintPattern],
    /// Fingerprints that would match `patterns` but are known-good.
    exemptions: &'static [FingerprintPattern],
}

/// Aggressive leech clients. All case-insensitive.
const LEECH_PATTERNS: &[FingerprintPattern] = &[
    prefix_ci("7."),
    prefix_ci("sd"),
    prefix_ci("xl"),
    prefix_ci("-xl"),
    prefix_ci("xun"),
    prefix_ci("unknown bt/7."),
    prefix_ci("unknown sd"),
    prefix_ci("unknown xl"),
];

/// Mainline BitTorrent builds that share the "Unknown BT/7." prefix
/// with the leech clients and must not be banned.
const LEECH_EXEMPTIONS: &[FingerprintPattern] = &[
    prefix_ci("unknown bt/7.9."),
    prefix_ci("unknown bt/7.10."),
    prefix_ci("unknown bt/7.0.0.0"),
];

/// P2P player clients: DanDan, StellarPlayer, DLBT, Qvod, Soda, Torch,
/// Vagaa, Xfplay, and their "Unknown <tag>" reporting variants.
const PLAYER_PATTERNS: &[FingerprintPattern] = &[
    prefix("dan"),
    prefix("stellarplayer"),
    prefix("DLB"),
    prefix("dlb"),
    prefix("Qvo"),
    prefix("qvo"),
    prefix("Sod"),
    prefix("sod"),
    prefix("Torc"),
    prefix("torc"),
    prefix("Vag"),
    prefix("vag"),
    prefix("Xfp"),
    prefix("xfp"),
    prefix("Ssp"),
    prefix("psp"),
    prefix("Unknown DL"),
    prefix("Unknown QVO"),
    prefix("Unknown TB"),
    prefix("Unknown UW"),
    prefix("Unknown VG"),
    prefix("Unknown XF"),
    prefix("Unknown SP"),
];

/// Miscellaneous offenders: Cacaoweb, FlashGet, Net Transport, QQ,
/// TuoTu, and their "Unknown <tag>" reporting variants. Net Transport
/// reports its name mid-string, hence the substring pattern.
const OTHER_PATTERNS: &[FingerprintPattern] = &[
    prefix("caca"),
    prefix("FlashG"),
    prefix("Flashg"),
    prefix("flashG"),
    prefix("flashg"),
    substring("ransp"),
    prefix_ci("qq"),
    prefix("Tuo"),
    prefix("tuo"),
    prefix("Unknown BN"),
    prefix("Unknown FG"),
    prefix("Unknown NX"),
    prefix("Unknown QD"),
    prefix("Unknown TT"),
];

/// All categories in precedence order.
const CATEGORY_TABLES: &[CategoryTable] = &[
    CategoryTable {
        category: Category::Leech,
        patterns: LEECH_PATTERNS,
        exemptions: LEECH_EXEMPTIONS,
    },
    CategoryTable {
        category: Category::Player,
        patterns: PLAYER_PATTERNS,
        exemptions: &[],
    },
    CategoryTable {
        category: Category::Other,
        patterns: OTHER_PATTERNS,
        exemptions: &[],
    },
];

impl CategoryTable {
    fn matches(&self, fingerprint: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(fingerprint))
            && !self.exemptions.iter().any(|p| p.matches(fingerprint))
    }
}

/// Immutable snapshot of one swarm peer at scan time.
#[derive(Debug, Clone)]
pub struct PeerObservation {
    /// Bare peer address (port and IPv6 brackets already stripped).
    pub host: String,
    pub port: u16,
    pub is_ipv6: bool,
    /// Self-reported client identification string.
    pub fingerprint: String,
    /// Download progress as a fraction in 0.0..=1.0.
    pub progress: f64,
    pub downloaded: u64,
    pub uploaded: u64,
    pub country: String,
}

/// Classification policy snapshot, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    pub ban_leech: bool,
    pub ban_player: bool,
    pub ban_others: bool,
    /// Ban any target-category peer without checking its ratio.
    pub skip_ratio_check: bool,
    /// Minimum uploaded bytes before a zero-progress peer is banned.
    pub upload_threshold: u64,
}

/// Default uploaded-bytes threshold for ratio-based confirmation (1 MiB).
pub const DEFAULT_UPLOAD_THRESHOLD: u64 = 1_048_576;

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            ban_leech: true,
            ban_player: true,
            ban_others: false,
            skip_ratio_check: true,
            upload_threshold: DEFAULT_UPLOAD_THRESHOLD,
        }
    }
}

impl ClassificationPolicy {
    fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Leech => self.ban_leech,
            Category::Player => self.ban_player,
            Category::Other => self.ban_others,
        }
    }
}

/// Find the first enabled category whose table matches the fingerprint.
///
/// Categories are tried in fixed precedence order; disabled categories
/// are skipped entirely. Returns `None` for empty or unrecognized
/// fingerprints.
pub fn match_category(fingerprint: &str, policy: &ClassificationPolicy) -> Option<Category> {
    if fingerprint.is_empty() {
        return None;
    }
    CATEGORY_TABLES
        .iter()
        .filter(|table| policy.category_enabled(table.category))
        .find(|table| table.matches(fingerprint))
        .map(|table| table.category)
}

/// Decide whether an observed peer should be banned.
///
/// A peer outside every enabled target category is never banned. A
/// target-category peer is banned immediately when ratio verification
/// is skipped; otherwise it is banned only when it claims zero
/// progress and zero downloaded bytes while having taken more than the
/// configured upload threshold from us.
pub fn classify(observation: &PeerObservation, policy: &ClassificationPolicy) -> bool {
    if match_category(&observation.fingerprint, policy).is_none() {
        return false;
    }
    if policy.skip_ratio_check {
        return true;
    }
    observation.progress == 0.0
        && observation.downloaded == 0
        && observation.uploaded > policy.upload_threshold
}
