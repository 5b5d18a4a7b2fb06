//! Free-text label heuristics.
//!
//! Upstream callers send loosely phrased labels ("Em contato", "Proposta
//! enviada", "Ganho"). Each label is lower-cased and checked against an
//! ordered rule table; the first rule whose needle is contained in the label
//! decides the target. Rule order is the tie-break, so "contato fechado"
//! resolves to [`StageName::Contato`].

use entity::deal::Status;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageName {
    Novo,
    Contato,
    Proposta,
    Negociacao,
    Fechado,
}

impl StageName {
    /// Stages every new pipeline starts with, in board order.
    pub const DEFAULTS: [StageName; 5] = [
        StageName::Novo,
        StageName::Contato,
        StageName::Proposta,
        StageName::Negociacao,
        StageName::Fechado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Novo => "Novo",
            StageName::Contato => "Contato",
            StageName::Proposta => "Proposta",
            StageName::Negociacao => "Negociacao",
            StageName::Fechado => "Fechado",
        }
    }

    /// Position used when seeding a fresh pipeline (1-based).
    pub fn default_position(self) -> i32 {
        match self {
            StageName::Novo => 1,
            StageName::Contato => 2,
            StageName::Proposta => 3,
            StageName::Negociacao => 4,
            StageName::Fechado => 5,
        }
    }
}

const STAGE_RULES: &[(&str, StageName)] = &[
    ("contat", StageName::Contato),
    ("propost", StageName::Proposta),
    ("negoci", StageName::Negociacao),
    ("fech", StageName::Fechado),
];

const STATUS_RULES: &[(&str, Status)] = &[
    ("ganh", Status::Won),
    ("won", Status::Won),
    ("perd", Status::Lost),
    ("lost", Status::Lost),
];

fn first_match<T: Copy>(label: &str, rules: &[(&str, T)], fallback: T) -> T {
    let label = label.to_lowercase();
    rules
        .iter()
        .find(|(needle, _)| label.contains(needle))
        .map(|(_, target)| *target)
        .unwrap_or(fallback)
}

/// Map a caller-supplied stage label onto one of the canonical stages.
pub fn resolve_stage(label: &str) -> StageName {
    first_match(label, STAGE_RULES, StageName::Novo)
}

/// Map a caller-supplied status label onto a deal status.
pub fn resolve_status(label: &str) -> Status {
    first_match(label, STATUS_RULES, Status::Open)
}
