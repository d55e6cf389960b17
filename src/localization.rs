//! # Localization Module
//!
//! Fluent-based message catalogue for every user-facing string the service
//! produces: extraction placeholders, summaries, chat fallback answers and
//! error messages. English and French resources are embedded at compile time.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use unic_langid::LanguageIdentifier;

/// Language used when a request does not ask for a supported one
pub const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager holding one Fluent bundle per supported language
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a new localization manager with all embedded languages
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in RESOURCES {
            let locale: LanguageIdentifier = language.parse()?;
            let bundle = Self::create_bundle(locale, source)?;
            bundles.insert((*language).to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Messages end up in JSON responses, so skip the bidi isolation marks
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid Fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Failed to add Fluent resource: {errors:?}"))?;

        Ok(bundle)
    }

    /// Languages with a loaded bundle
    pub fn supported_languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Get a localized message, falling back to English for unsupported languages
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let Some(bundle) = self
            .bundles
            .get(normalize_language(language))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            log::debug!("Fluent formatting errors for '{key}': {errors:?}");
        }
        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, language: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().copied().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }
}

/// Reduce tags such as "fr-CA" or "en_US" to their primary language subtag
fn normalize_language(language: &str) -> &str {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or(DEFAULT_LANGUAGE)
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().unwrap_or_else(|e| {
        log::error!("Failed to load embedded translations: {e}");
        LocalizationManager {
            bundles: HashMap::new(),
        }
    })
});

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Localized message in the default language
pub fn t(key: &str) -> String {
    t_lang(key, DEFAULT_LANGUAGE)
}

/// Localized message in the given language
pub fn t_lang(key: &str, language: &str) -> String {
    get_localization_manager().get_message_in_language(key, language, None)
}

/// Localized message with arguments in the given language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language: &str) -> String {
    get_localization_manager().get_message_with_args(key, language, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("fr-CA"), "fr");
        assert_eq!(normalize_language("en_US"), "en");
        assert_eq!(normalize_language("fr"), "fr");
    }

    #[test]
    fn test_both_languages_loaded() {
        let manager = LocalizationManager::new().unwrap();
        assert_eq!(manager.supported_languages(), vec!["en", "fr"]);
    }

    #[test]
    fn test_args_are_not_isolated() {
        let message = t_args_lang("chat-calories", &[("product", "Special K"), ("calories", "190")], "en");
        assert_eq!(message, "Special K has 190 calories per serving.");
    }
}
