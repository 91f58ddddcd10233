//! Maps school display names to site extractors.
//!
//! Rules run in a fixed order, each across all extractors in registration
//! order, so a given name and registry always resolve the same way:
//!
//! 1. a short code is a substring of the lowercased, space-stripped name
//! 2. the initials of the name's words (longer than one letter) equal a code
//! 3. a name word (longer than two letters) is a substring of a code
//! 4. the default extractor, reported through [`Dispatch::notice`]

use crate::config::Unmatched;
use crate::extract::generic::{GENERIC_CODE, GenericExtractor};
use crate::extract::sites::{bsm::Bsm, cism::Cism, faith::Faith, ism::Ism, ris::Ris, ssm::Ssm, vcis::Vcis};
use crate::extract::SiteExtractor;
use crate::models::SchoolDescriptor;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub type Factory = fn() -> Arc<dyn SiteExtractor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Named by the catalog record.
    Pinned,
    ShortCode,
    Acronym,
    Partial,
    Default,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchRule::Pinned => "pinned",
            MatchRule::ShortCode => "short-code",
            MatchRule::Acronym => "acronym",
            MatchRule::Partial => "partial",
            MatchRule::Default => "default",
        };
        f.write_str(s)
    }
}

pub struct Dispatch {
    pub extractor: Arc<dyn SiteExtractor>,
    pub rule: MatchRule,
    /// Set whenever no rule matched; callers must surface it.
    pub notice: Option<String>,
}

impl Dispatch {
    pub fn code(&self) -> &str {
        &self.extractor.profile().short_code
    }
}

struct Entry {
    code: &'static str,
    factory: Factory,
    instance: OnceLock<Arc<dyn SiteExtractor>>,
}

impl Entry {
    fn new(code: &'static str, factory: Factory) -> Self {
        Self { code, factory, instance: OnceLock::new() }
    }

    fn get(&self) -> Arc<dyn SiteExtractor> {
        Arc::clone(self.instance.get_or_init(self.factory))
    }
}

pub struct Registry {
    /// Index 0 is the default.
    entries: Vec<Entry>,
}

// ── Built-in extractors ───────────────────────────────────────────────────────

fn ism() -> Arc<dyn SiteExtractor> {
    Arc::new(Ism::new())
}

fn bsm() -> Arc<dyn SiteExtractor> {
    Arc::new(Bsm::new())
}

fn cism() -> Arc<dyn SiteExtractor> {
    Arc::new(Cism::new())
}

fn ris() -> Arc<dyn SiteExtractor> {
    Arc::new(Ris::new())
}

fn ssm() -> Arc<dyn SiteExtractor> {
    Arc::new(Ssm::new())
}

fn faith() -> Arc<dyn SiteExtractor> {
    Arc::new(Faith::new())
}

fn vcis() -> Arc<dyn SiteExtractor> {
    Arc::new(Vcis::new())
}

impl Registry {
    /// Registry whose fallback is `default_code`.
    pub fn new(default_code: &'static str, default_factory: Factory) -> Self {
        Self { entries: vec![Entry::new(default_code, default_factory)] }
    }

    pub fn builtin() -> Self {
        Self::new("ISM", ism)
            .with("BSM", bsm)
            .with("CISM", cism)
            .with("RIS", ris)
            .with("SSM", ssm)
            .with("Faith", faith)
            .with("VCIS", vcis)
    }

    pub fn with(mut self, code: &'static str, factory: Factory) -> Self {
        self.entries.push(Entry::new(code, factory));
        self
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.code).collect()
    }

    /// Extractor registered under `code`, compared case-insensitively.
    pub fn get(&self, code: &str) -> Option<Arc<dyn SiteExtractor>> {
        self.entries
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
            .map(Entry::get)
    }

    fn dispatch(&self, entry: &Entry, rule: MatchRule) -> Dispatch {
        Dispatch { extractor: entry.get(), rule, notice: None }
    }

    /// Resolve a display name by the fuzzy rules alone.
    pub fn resolve(&self, name: &str) -> Dispatch {
        let normalized: String = name.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
        let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();

        if let Some(e) = self.entries.iter().find(|e| normalized.contains(&e.code.to_lowercase())) {
            debug!("`{}` -> {} by short code", name, e.code);
            return self.dispatch(e, MatchRule::ShortCode);
        }

        let initials: String = words
            .iter()
            .filter(|w| w.chars().count() > 1)
            .filter_map(|w| w.chars().next())
            .collect();
        if let Some(e) = self.entries.iter().find(|e| e.code.eq_ignore_ascii_case(&initials)) {
            debug!("`{}` -> {} by acronym `{}`", name, e.code, initials);
            return self.dispatch(e, MatchRule::Acronym);
        }

        let long_words: Vec<&String> = words.iter().filter(|w| w.chars().count() > 2).collect();
        if let Some(e) = self
            .entries
            .iter()
            .find(|e| long_words.iter().any(|w| e.code.to_lowercase().contains(w.as_str())))
        {
            debug!("`{}` -> {} by partial word", name, e.code);
            return self.dispatch(e, MatchRule::Partial);
        }

        let default = &self.entries[0];
        Dispatch {
            extractor: default.get(),
            rule: MatchRule::Default,
            notice: Some(format!("no extractor matches `{}`; falling back to {}", name, default.code)),
        }
    }

    /// Resolve a catalog record: its pin first, then the name rules. An
    /// unmatched school goes to the generic extractor when `unmatched` says so.
    pub fn resolve_school(&self, school: &SchoolDescriptor, unmatched: Unmatched) -> Dispatch {
        if let Some(pin) = school.extractor.as_deref() {
            if pin.eq_ignore_ascii_case(GENERIC_CODE) {
                return generic_dispatch(school, MatchRule::Pinned, None);
            }
            match self.get(pin) {
                Some(extractor) => return Dispatch { extractor, rule: MatchRule::Pinned, notice: None },
                None => warn!("{}: unknown extractor `{}` in catalog, using name rules", school.name, pin),
            }
        }

        let dispatch = self.resolve(&school.name);
        match (dispatch.rule, unmatched) {
            (MatchRule::Default, Unmatched::Generic) => generic_dispatch(
                school,
                MatchRule::Default,
                Some(format!("no extractor matches `{}`; using generic extraction", school.name)),
            ),
            _ => dispatch,
        }
    }
}

fn generic_dispatch(school: &SchoolDescriptor, rule: MatchRule, notice: Option<String>) -> Dispatch {
    Dispatch { extractor: Arc::new(GenericExtractor::new(school.clone())), rule, notice }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> (String, MatchRule) {
        let d = Registry::builtin().resolve(name);
        (d.code().to_string(), d.rule)
    }

    #[test]
    fn acronym_selects_ism_every_time() {
        let registry = Registry::new("BSM", bsm).with("ISM", ism);
        let first = registry.resolve("International School Manila");
        let second = registry.resolve("International School Manila");
        assert_eq!(first.code(), "ISM");
        assert_eq!(first.rule, MatchRule::Acronym);
        assert!(Arc::ptr_eq(&first.extractor, &second.extractor));
        assert!(first.notice.is_none());
    }

    #[test]
    fn builtin_catalog_names() {
        assert_eq!(resolve("British School Manila"), ("BSM".into(), MatchRule::Acronym));
        assert_eq!(resolve("Chinese International School Manila"), ("CISM".into(), MatchRule::Acronym));
        assert_eq!(resolve("Reedley International School"), ("RIS".into(), MatchRule::Acronym));
        assert_eq!(resolve("Singapore School Manila"), ("SSM".into(), MatchRule::Acronym));
        assert_eq!(resolve("Faith Academy"), ("Faith".into(), MatchRule::ShortCode));
        assert_eq!(resolve("ISM"), ("ISM".into(), MatchRule::ShortCode));
    }

    #[test]
    fn short_code_rule_runs_before_acronyms() {
        // "ch-ris-tian" hits RIS before the VCIS acronym is considered.
        assert_eq!(resolve("Victory Christian International School"), ("RIS".into(), MatchRule::ShortCode));
    }

    #[test]
    fn partial_word_rule() {
        let registry = Registry::new("ISM", ism).with("FAITHACAD", faith);
        let d = registry.resolve("Faith Baptist");
        assert_eq!(d.code(), "Faith");
        assert_eq!(d.rule, MatchRule::Partial);
    }

    #[test]
    fn unmatched_name_falls_back_with_notice() {
        let d = Registry::builtin().resolve("The Learning Place International School");
        assert_eq!(d.code(), "ISM");
        assert_eq!(d.rule, MatchRule::Default);
        assert!(d.notice.unwrap().contains("The Learning Place"));
    }

    #[test]
    fn catalog_pin_wins_over_name_rules() {
        let registry = Registry::builtin();
        let mut school = SchoolDescriptor::new("Victory Christian International School");
        school.extractor = Some("vcis".into());
        let d = registry.resolve_school(&school, Unmatched::Default);
        assert_eq!(d.code(), "VCIS");
        assert_eq!(d.rule, MatchRule::Pinned);

        school.extractor = Some("generic".into());
        assert_eq!(registry.resolve_school(&school, Unmatched::Default).code(), GENERIC_CODE);
    }

    #[test]
    fn unmatched_policy_routes_to_generic() {
        let registry = Registry::builtin();
        let school = SchoolDescriptor::new("Southville International School and Colleges");
        let d = registry.resolve_school(&school, Unmatched::Generic);
        assert_eq!(d.code(), GENERIC_CODE);
        assert!(d.notice.is_some());
        assert_eq!(registry.resolve_school(&school, Unmatched::Default).code(), "ISM");
    }
}
