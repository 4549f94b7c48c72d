//! Per-language selector tables.
//!
//! Language variants differ only in these selector strings; the extraction
//! algorithms in [`super::extract`] are shared. Adding a language means
//! adding a row here, nothing else.

#[derive(Debug, Clone, Copy)]
pub struct LanguageSelectors {
    pub language: &'static str,
    /// Container of today's featured article on the homepage.
    pub featured: &'static str,
    /// Container of the "did you know…" block on the homepage.
    pub did_you_know: &'static str,
}

pub const LANGUAGES: &[LanguageSelectors] = &[
    LanguageSelectors {
        language: "en",
        featured: "div#mp-tfa",
        did_you_know: "div#mp-dyk",
    },
    LanguageSelectors {
        language: "de",
        featured: "div#mf-tfa",
        did_you_know: "div#mf-dyk",
    },
    LanguageSelectors {
        language: "fr",
        featured: "div#accueil-lumieresur",
        did_you_know: "div#SaviezVous",
    },
    LanguageSelectors {
        language: "eo",
        featured: "div#mf-artikolo-de-la-semajno",
        did_you_know: "div#mw-content-text td",
    },
];

pub fn selectors_for(language: &str) -> Option<&'static LanguageSelectors> {
    LANGUAGES.iter().find(|entry| entry.language == language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_resolve() {
        for code in ["en", "de", "fr", "eo"] {
            assert!(selectors_for(code).is_some(), "missing selectors for {code}");
        }
        assert!(selectors_for("xx").is_none());
    }
}
