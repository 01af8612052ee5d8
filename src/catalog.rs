//! Provider and model catalog.
//!
//! The extraction service fronts three vendors. Each vendor exposes two
//! ordered model lists: *layout* models (decide whether a page needs
//! structure-aware extraction) and *description* models (produce the content
//! of layout-dependent pages). A session may only submit a model pair drawn
//! from the selected provider's lists.
//!
//! The mapping is a closed one: [`Provider`] is an enum and
//! [`ModelCatalog`] holds one [`ProviderModels`] slot per variant, so a lookup
//! can never miss. All list invariants (non-empty, at most one default, no
//! duplicate ids) are checked when the catalog is built, not when it is read.

use crate::error::WorkbenchError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extraction-service backend. The wire identifier doubles as the path
/// segment in `/api/{provider}/parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 3] = [Provider::Anthropic, Provider::Gemini, Provider::OpenAi];

    /// Wire identifier (`anthropic`, `gemini`, `openai`).
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        }
    }

    /// Human-readable vendor name.
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Google Gemini",
            Provider::OpenAi => "OpenAI",
        }
    }

    fn slot(self) -> usize {
        match self {
            Provider::Anthropic => 0,
            Provider::Gemini => 1,
            Provider::OpenAi => 2,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            _ => Err(WorkbenchError::UnknownProvider(s.to_string())),
        }
    }
}

/// Which of a provider's two lists a model is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Layout,
    Description,
}

impl ModelRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::Layout => "layout",
            ModelRole::Description => "description",
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub is_default: bool,
}

impl ModelOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            is_default: false,
        }
    }

    /// Mark this entry as the list's default.
    pub fn marked_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// A validated, ordered, non-empty model list with at most one default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelList {
    options: Vec<ModelOption>,
}

impl ModelList {
    /// Validate and wrap `options`.
    pub fn new(options: Vec<ModelOption>) -> Result<Self, WorkbenchError> {
        if options.is_empty() {
            return Err(WorkbenchError::InvalidCatalog(
                "model list must not be empty".into(),
            ));
        }
        let defaults = options.iter().filter(|o| o.is_default).count();
        if defaults > 1 {
            return Err(WorkbenchError::InvalidCatalog(format!(
                "model list marks {defaults} defaults, at most one is allowed"
            )));
        }
        for (i, option) in options.iter().enumerate() {
            if option.id.trim().is_empty() {
                return Err(WorkbenchError::InvalidCatalog(
                    "model id must not be empty".into(),
                ));
            }
            if options[..i].iter().any(|o| o.id == option.id) {
                return Err(WorkbenchError::InvalidCatalog(format!(
                    "duplicate model id '{}'",
                    option.id
                )));
            }
        }
        Ok(Self { options })
    }

    /// The default-marked entry, else the first one.
    pub fn default_model(&self) -> &ModelOption {
        self.options
            .iter()
            .find(|o| o.is_default)
            .unwrap_or(&self.options[0])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.options.iter().any(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// The layout/description list pair of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderModels {
    pub layout: ModelList,
    pub description: ModelList,
}

impl ProviderModels {
    pub fn new(layout: ModelList, description: ModelList) -> Self {
        Self {
            layout,
            description,
        }
    }

    pub fn list(&self, role: ModelRole) -> &ModelList {
        match role {
            ModelRole::Layout => &self.layout,
            ModelRole::Description => &self.description,
        }
    }

    /// `(layout, description)` defaults used when the provider is selected.
    pub fn defaults(&self) -> (&str, &str) {
        (
            self.layout.default_model().id.as_str(),
            self.description.default_model().id.as_str(),
        )
    }
}

/// Closed mapping from every [`Provider`] to its model lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    slots: [ProviderModels; 3],
}

static BUILTIN: Lazy<ModelCatalog> =
    Lazy::new(|| ModelCatalog::from_table(BUILTIN_TABLE).expect("built-in model table is valid"));

/// `(provider, layout, description)` with `(id, label, default)` entries.
type Table<'a> = &'a [(Provider, &'a [(&'a str, &'a str, bool)], &'a [(&'a str, &'a str, bool)])];

const BUILTIN_TABLE: Table<'static> = &[
    (
        Provider::Anthropic,
        &[
            ("claude-3-5-haiku-latest", "Claude 3.5 Haiku", true),
            ("claude-3-7-sonnet-latest", "Claude 3.7 Sonnet", false),
        ],
        &[
            ("claude-3-7-sonnet-latest", "Claude 3.7 Sonnet", true),
            ("claude-3-5-haiku-latest", "Claude 3.5 Haiku", false),
        ],
    ),
    (
        Provider::Gemini,
        &[
            ("gemini-2.0-flash-lite", "Gemini 2.0 Flash-Lite", true),
            ("gemini-2.0-flash", "Gemini 2.0 Flash", false),
        ],
        &[
            ("gemini-2.0-flash", "Gemini 2.0 Flash", true),
            ("gemini-1.5-pro", "Gemini 1.5 Pro", false),
        ],
    ),
    (
        Provider::OpenAi,
        &[
            ("gpt-4.1-nano", "GPT-4.1 nano", true),
            ("gpt-4.1-mini", "GPT-4.1 mini", false),
            ("gpt-4o-mini", "GPT-4o mini", false),
        ],
        &[
            ("gpt-4.1", "GPT-4.1", true),
            ("gpt-4o", "GPT-4o", false),
            ("gpt-4.1-mini", "GPT-4.1 mini", false),
        ],
    ),
];

impl ModelCatalog {
    /// The catalog the extraction service ships with.
    pub fn builtin() -> &'static ModelCatalog {
        &BUILTIN
    }

    /// Build a catalog; every provider must appear exactly once.
    pub fn new(
        entries: impl IntoIterator<Item = (Provider, ProviderModels)>,
    ) -> Result<Self, WorkbenchError> {
        let mut slots: [Option<ProviderModels>; 3] = [None, None, None];
        for (provider, models) in entries {
            let slot = &mut slots[provider.slot()];
            if slot.is_some() {
                return Err(WorkbenchError::InvalidCatalog(format!(
                    "provider '{provider}' listed twice"
                )));
            }
            *slot = Some(models);
        }
        let [a, g, o] = slots;
        match (a, g, o) {
            (Some(a), Some(g), Some(o)) => Ok(Self { slots: [a, g, o] }),
            (a, g, _) => {
                let missing = if a.is_none() {
                    Provider::Anthropic
                } else if g.is_none() {
                    Provider::Gemini
                } else {
                    Provider::OpenAi
                };
                Err(WorkbenchError::InvalidCatalog(format!(
                    "provider '{missing}' has no model lists"
                )))
            }
        }
    }

    fn from_table(table: Table<'_>) -> Result<Self, WorkbenchError> {
        let to_list = |rows: &[(&str, &str, bool)]| {
            ModelList::new(
                rows.iter()
                    .map(|&(id, label, is_default)| ModelOption {
                        id: id.to_string(),
                        label: label.to_string(),
                        is_default,
                    })
                    .collect(),
            )
        };
        let mut entries = Vec::with_capacity(table.len());
        for &(provider, layout, description) in table {
            entries.push((
                provider,
                ProviderModels::new(to_list(layout)?, to_list(description)?),
            ));
        }
        Self::new(entries)
    }

    pub fn models(&self, provider: Provider) -> &ProviderModels {
        &self.slots[provider.slot()]
    }

    /// Reject `model` unless it belongs to `provider`'s `role` list.
    pub fn check(
        &self,
        provider: Provider,
        role: ModelRole,
        model: &str,
    ) -> Result<(), WorkbenchError> {
        if self.models(provider).list(role).contains(model) {
            Ok(())
        } else {
            Err(WorkbenchError::ModelNotAllowed {
                provider: provider.to_string(),
                role: role.as_str(),
                model: model.to_string(),
            })
        }
    }
}
