//! 校验文案本地化
//!
//! 进程级的文案目录：当前语言缺失时回退到 fallback 语言，仍缺失则返回键本身；
//! 文案中的 `{param}` 由参数替换，未提供的参数原样保留。
//!
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"));

static GLOBAL: LazyLock<RwLock<Locale>> = LazyLock::new(|| RwLock::new(Locale::default()));

const EN: &[(&str, &str)] = &[
    ("required", "This field is required"),
    ("email", "Invalid email address"),
    ("url", "Invalid URL"),
    ("minLength", "Must be at least {min} characters"),
    ("maxLength", "Must be at most {max} characters"),
    ("min", "Must be at least {min}"),
    ("max", "Must be at most {max}"),
    ("between", "Must be between {min} and {max}"),
    ("numeric", "Must be a number"),
    ("integer", "Must be an integer"),
    ("alpha", "Must contain only letters"),
    ("alphanumeric", "Must contain only letters and numbers"),
    ("date", "Must be a valid date"),
    ("before", "Must be before {date}"),
    ("after", "Must be after {date}"),
    ("match", "Invalid format"),
    ("in", "Must be one of: {values}"),
    ("notIn", "Must not be one of: {values}"),
    ("boolean", "Must be a boolean"),
    ("object", "Must be an object"),
    ("array", "Must be an array"),
];

const ES: &[(&str, &str)] = &[
    ("required", "Este campo es obligatorio"),
    ("email", "Dirección de correo inválida"),
    ("url", "URL inválida"),
    ("minLength", "Debe tener al menos {min} caracteres"),
    ("maxLength", "Debe tener como máximo {max} caracteres"),
    ("min", "Debe ser al menos {min}"),
    ("max", "Debe ser como máximo {max}"),
    ("between", "Debe estar entre {min} y {max}"),
    ("numeric", "Debe ser un número"),
    ("integer", "Debe ser un número entero"),
    ("alpha", "Debe contener solo letras"),
    ("alphanumeric", "Debe contener solo letras y números"),
    ("date", "Debe ser una fecha válida"),
    ("before", "Debe ser antes de {date}"),
    ("after", "Debe ser después de {date}"),
    ("match", "Formato inválido"),
    ("in", "Debe ser uno de: {values}"),
    ("notIn", "No debe ser uno de: {values}"),
    ("boolean", "Debe ser un valor booleano"),
    ("object", "Debe ser un objeto"),
    ("array", "Debe ser un array"),
];

const FR: &[(&str, &str)] = &[
    ("required", "Ce champ est requis"),
    ("email", "Adresse email invalide"),
    ("url", "URL invalide"),
    ("minLength", "Doit contenir au moins {min} caractères"),
    ("maxLength", "Doit contenir au maximum {max} caractères"),
    ("min", "Doit être au moins {min}"),
    ("max", "Doit être au maximum {max}"),
    ("between", "Doit être entre {min} et {max}"),
    ("numeric", "Doit être un nombre"),
    ("integer", "Doit être un nombre entier"),
    ("alpha", "Doit contenir uniquement des lettres"),
    ("alphanumeric", "Doit contenir uniquement des lettres et des chiffres"),
    ("date", "Doit être une date valide"),
    ("before", "Doit être avant {date}"),
    ("after", "Doit être après {date}"),
    ("match", "Format invalide"),
    ("in", "Doit être l'un des: {values}"),
    ("notIn", "Ne doit pas être l'un des: {values}"),
    ("boolean", "Doit être un booléen"),
    ("object", "Doit être un objet"),
    ("array", "Doit être un tableau"),
];

const DE: &[(&str, &str)] = &[
    ("required", "Dieses Feld ist erforderlich"),
    ("email", "Ungültige E-Mail-Adresse"),
    ("url", "Ungültige URL"),
    ("minLength", "Muss mindestens {min} Zeichen lang sein"),
    ("maxLength", "Darf maximal {max} Zeichen lang sein"),
    ("min", "Muss mindestens {min} sein"),
    ("max", "Darf maximal {max} sein"),
    ("between", "Muss zwischen {min} und {max} liegen"),
    ("numeric", "Muss eine Zahl sein"),
    ("integer", "Muss eine ganze Zahl sein"),
    ("alpha", "Darf nur Buchstaben enthalten"),
    ("alphanumeric", "Darf nur Buchstaben und Zahlen enthalten"),
    ("date", "Muss ein gültiges Datum sein"),
    ("before", "Muss vor {date} sein"),
    ("after", "Muss nach {date} sein"),
    ("match", "Ungültiges Format"),
    ("in", "Muss eines der folgenden sein: {values}"),
    ("notIn", "Darf keines der folgenden sein: {values}"),
    ("boolean", "Muss ein boolescher Wert sein"),
    ("object", "Muss ein Objekt sein"),
    ("array", "Muss ein Array sein"),
];

/// 文案目录
#[derive(Debug, Clone)]
pub struct Locale {
    locale: String,
    fallback: String,
    messages: HashMap<String, HashMap<String, String>>,
}

impl Default for Locale {
    fn default() -> Self {
        let mut locale = Self {
            locale: "en".to_string(),
            fallback: "en".to_string(),
            messages: HashMap::new(),
        };
        for (name, table) in [("en", EN), ("es", ES), ("fr", FR), ("de", DE)] {
            locale.add_messages(
                name,
                table.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            );
        }
        locale
    }
}

impl Locale {
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    pub fn set_fallback(&mut self, locale: impl Into<String>) {
        self.fallback = locale.into();
    }

    /// 合并某个语言的文案（同名键覆盖）
    pub fn add_messages<I>(&mut self, locale: &str, messages: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.messages
            .entry(locale.to_string())
            .or_default()
            .extend(messages);
    }

    /// 查找并插值；找不到时返回键本身
    pub fn message(&self, key: &str, params: &[(&str, String)]) -> String {
        let template = [&self.locale, &self.fallback]
            .into_iter()
            .find_map(|locale| self.messages.get(locale.as_str())?.get(key))
            .map(String::as_str)
            .unwrap_or(key);

        interpolate(template, params)
    }
}

fn interpolate(template: &str, params: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            params
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ---- 进程级目录 ----

pub fn set_locale(locale: &str) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .set_locale(locale);
}

pub fn set_fallback(locale: &str) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .set_fallback(locale);
}

pub fn add_messages<I>(locale: &str, messages: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_messages(locale, messages);
}

pub fn current() -> String {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .locale()
        .to_string()
}

pub fn message(key: &str, params: &[(&str, String)]) -> String {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .message(key, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_by_default_with_interpolation() {
        let locale = Locale::default();
        assert_eq!(
            locale.message("between", &[("min", "1".into()), ("max", "5".into())]),
            "Must be between 1 and 5"
        );
    }

    #[test]
    fn missing_params_are_left_verbatim() {
        let locale = Locale::default();
        assert_eq!(locale.message("min", &[]), "Must be at least {min}");
    }

    #[test]
    fn falls_back_then_returns_key() {
        let mut locale = Locale::default();
        locale.set_locale("es");
        assert_eq!(locale.message("required", &[]), "Este campo es obligatorio");

        locale.add_messages("pt", [("required".to_string(), "Obrigatório".to_string())]);
        locale.set_locale("pt");
        assert_eq!(locale.message("required", &[]), "Obrigatório");
        // pt 缺少 email，回退到 en
        assert_eq!(locale.message("email", &[]), "Invalid email address");
        assert_eq!(locale.message("no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn global_catalogue_defaults_to_english() {
        assert_eq!(message("array", &[]), "Must be an array");
    }
}
