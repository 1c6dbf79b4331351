//! Marketing/CRM actions keyed by RFV score

use std::collections::BTreeMap;

use crate::error::RfvError;
use crate::segment::RfvScore;

pub const ACTION_COLUMN: &str = "acoes de marketing/crm";

/// Built-in actions. `DAA` and `CAA` intentionally share the same text.
pub const DEFAULT_ACTIONS: [(&str, &str); 4] = [
    (
        "AAA",
        "Enviar cupons de desconto, Pedir para indicar nosso produto pra algum amigo, \
         Ao lançar um novo produto enviar amostras grátis pra esses.",
    ),
    (
        "DDD",
        "Churn! clientes que gastaram bem pouco e fizeram poucas compras, fazer nada",
    ),
    (
        "DAA",
        "Churn! clientes que gastaram bastante e fizeram muitas compras, \
         enviar cupons de desconto para tentar recuperar",
    ),
    (
        "CAA",
        "Churn! clientes que gastaram bastante e fizeram muitas compras, \
         enviar cupons de desconto para tentar recuperar",
    ),
];

/// Immutable score -> action lookup. Scores without an entry have no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable {
    entries: BTreeMap<RfvScore, String>,
}

impl Default for ActionTable {
    fn default() -> Self {
        let entries = DEFAULT_ACTIONS
            .iter()
            .filter_map(|(score, action)| Some((score.parse::<RfvScore>().ok()?, action.to_string())))
            .collect();
        Self { entries }
    }
}

impl ActionTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace entries; keys must be valid scores
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Result<Self, RfvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (score, action) in overrides {
            let score: RfvScore = score.as_ref().trim().parse()?;
            self.entries.insert(score, action.into());
        }
        Ok(self)
    }

    pub fn lookup(&self, score: &RfvScore) -> Option<&str> {
        self.entries.get(score).map(String::as_str)
    }

    /// Like [`ActionTable::lookup`]; strings that are not scores have no action
    pub fn lookup_str(&self, score: &str) -> Option<&str> {
        let score: RfvScore = score.parse().ok()?;
        self.lookup(&score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RfvScore, &str)> {
        self.entries.iter().map(|(score, action)| (score, action.as_str()))
    }
}
