//! English inflection used to derive resource names, route segments and flash text.
//!
//! Case conversion is delegated to `heck`; the plural/singular rule tables live here.
//! Rules only ever touch the trailing word, so `BlogPost`, `blog_post` and `Blog::Post`
//! all inflect on `Post`.

use heck::{ToSnakeCase, ToUpperCamelCase};

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
    "metadata",
];

/// `(singular, plural)`
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("ox", "oxen"),
    ("mouse", "mice"),
    ("louse", "lice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
];

/// Splits `word` into everything before its last word and the last word itself.
fn split_last_word(word: &str) -> (&str, &str) {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let mut start = 0;
    for i in (0..chars.len()).rev() {
        let (idx, c) = chars[i];
        if !c.is_alphanumeric() {
            start = idx + c.len_utf8();
            break;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1].1;
            let next_is_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                start = idx;
                break;
            }
        }
    }
    word.split_at(start)
}

/// Re-applies the capitalisation of `original` to the inflected lowercase `word`.
fn restore_case(original: &str, word: &str) -> String {
    let mut chars = original.chars();
    let first_upper = chars.next().is_some_and(char::is_uppercase);
    let all_upper = original.len() > 1 && original.chars().all(|c| !c.is_lowercase());

    if all_upper {
        word.to_uppercase()
    } else if first_upper {
        let mut out = String::with_capacity(word.len());
        let mut it = word.chars();
        if let Some(c) = it.next() {
            out.extend(c.to_uppercase());
        }
        out.push_str(it.as_str());
        out
    } else {
        word.to_string()
    }
}

fn replace_suffix(word: &str, suffix: &str, replacement: &str) -> Option<String> {
    word.strip_suffix(suffix)
        .map(|stem| format!("{stem}{replacement}"))
}

fn ends_with_consonant_y(word: &str) -> bool {
    let Some(stem) = word.strip_suffix('y') else {
        return false;
    };
    if stem.ends_with("qu") {
        return true;
    }
    stem.chars()
        .last()
        .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y'))
}

fn pluralize_word(w: &str) -> String {
    if w.is_empty() || UNCOUNTABLE.contains(&w) {
        return w.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if w == *plural {
            return w.to_string();
        }
        if w == *singular {
            return (*plural).to_string();
        }
    }

    if w.ends_with("quiz") {
        return format!("{w}zes");
    }
    for stem in ["matr", "vert", "ind"] {
        if let Some(out) = replace_suffix(w, &format!("{stem}ix"), &format!("{stem}ices"))
            .or_else(|| replace_suffix(w, &format!("{stem}ex"), &format!("{stem}ices")))
        {
            return out;
        }
    }
    if ["x", "ch", "ss", "sh", "z"].iter().any(|s| w.ends_with(s)) {
        return format!("{w}es");
    }
    if ends_with_consonant_y(w) {
        return format!("{}ies", &w[..w.len() - 1]);
    }
    if w.ends_with("hive") {
        return format!("{w}s");
    }
    if let Some(stem) = w.strip_suffix("fe") {
        if !stem.ends_with('f') {
            return format!("{stem}ves");
        }
    }
    if let Some(stem) = w.strip_suffix('f') {
        if stem.ends_with('l') || stem.ends_with('r') {
            return format!("{stem}ves");
        }
    }
    if let Some(out) = replace_suffix(w, "sis", "ses") {
        return out;
    }
    if w.ends_with("tum") || w.ends_with("ium") {
        return format!("{}a", &w[..w.len() - 2]);
    }
    if w.ends_with("buffalo") || w.ends_with("tomato") {
        return format!("{w}es");
    }
    if w.ends_with("bus") || w.ends_with("alias") || w.ends_with("status") {
        return format!("{w}es");
    }
    if let Some(stem) = w.strip_suffix("octopus").or_else(|| w.strip_suffix("virus")) {
        let root = &w[stem.len()..w.len() - 2];
        return format!("{stem}{root}i");
    }
    if w.ends_with('s') {
        return w.to_string();
    }
    format!("{w}s")
}

fn singularize_word(w: &str) -> String {
    if w.is_empty() || UNCOUNTABLE.contains(&w) {
        return w.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if w == *plural {
            return (*singular).to_string();
        }
        if w == *singular {
            return w.to_string();
        }
    }

    if let Some(out) = replace_suffix(w, "databases", "database")
        .or_else(|| replace_suffix(w, "quizzes", "quiz"))
        .or_else(|| replace_suffix(w, "matrices", "matrix"))
        .or_else(|| replace_suffix(w, "vertices", "vertex"))
        .or_else(|| replace_suffix(w, "indices", "index"))
        .or_else(|| replace_suffix(w, "aliases", "alias"))
        .or_else(|| replace_suffix(w, "statuses", "status"))
        .or_else(|| replace_suffix(w, "octopi", "octopus"))
        .or_else(|| replace_suffix(w, "viri", "virus"))
        .or_else(|| replace_suffix(w, "buses", "bus"))
        .or_else(|| replace_suffix(w, "shoes", "shoe"))
        .or_else(|| replace_suffix(w, "movies", "movie"))
        .or_else(|| replace_suffix(w, "hives", "hive"))
        .or_else(|| replace_suffix(w, "tives", "tive"))
    {
        return out;
    }
    if w.ends_with("alias") || w.ends_with("status") || w.ends_with("us") || w.ends_with("ss") {
        return w.to_string();
    }
    if w.ends_with("oes") {
        return w[..w.len() - 2].to_string();
    }
    for suffix in ["xes", "ches", "sses", "shes"] {
        if w.ends_with(suffix) {
            return w[..w.len() - 2].to_string();
        }
    }
    if let Some(stem) = w.strip_suffix("ies") {
        if stem.len() > 1 {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = w.strip_suffix("ves") {
        if stem.ends_with('l') || stem.ends_with('r') {
            return format!("{stem}f");
        }
        return format!("{stem}fe");
    }
    for stem in ["analy", "ba", "diagno", "parenthe", "progno", "synop", "the", "cri", "te", "ax"] {
        if let Some(out) = replace_suffix(w, &format!("{stem}ses"), &format!("{stem}sis")) {
            return out;
        }
    }
    if w.ends_with("sis") {
        return w.to_string();
    }
    if w.ends_with("ta") || w.ends_with("ia") {
        return format!("{}um", &w[..w.len() - 1]);
    }
    if let Some(stem) = w.strip_suffix('s') {
        return stem.to_string();
    }
    w.to_string()
}

/// `post` → `posts`, `BlogCategory` → `BlogCategories`, `Blog::Person` → `Blog::People`.
///
/// Already-plural words are returned unchanged for every regular pattern.
#[must_use]
pub fn pluralize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let inflected = pluralize_word(&last.to_lowercase());
    format!("{head}{}", restore_case(last, &inflected))
}

/// Inverse of [`pluralize`].
#[must_use]
pub fn singularize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let inflected = singularize_word(&last.to_lowercase());
    format!("{head}{}", restore_case(last, &inflected))
}

/// `Blog::BlogPost` → `blog/blog_post`
#[must_use]
pub fn underscore(word: &str) -> String {
    word.replace("::", "/")
        .split('/')
        .map(ToSnakeCase::to_snake_case)
        .collect::<Vec<_>>()
        .join("/")
}

/// `blog/blog_post` → `Blog::BlogPost`
#[must_use]
pub fn camelize(word: &str) -> String {
    word.split('/')
        .map(ToUpperCamelCase::to_upper_camel_case)
        .collect::<Vec<_>>()
        .join("::")
}

/// `blog_posts` → `BlogPost`
#[must_use]
pub fn classify(word: &str) -> String {
    camelize(&singularize(word))
}

/// `author_id` → `Author`, `published_at` → `Published at`
#[must_use]
pub fn humanize(word: &str) -> String {
    let stripped = word.strip_suffix("_id").unwrap_or(word);
    let spaced = stripped.replace('_', " ").trim().to_lowercase();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `blog_post` → `Blog Post`, `BlogPost` → `Blog Post`
#[must_use]
pub fn titleize(word: &str) -> String {
    humanize(&underscore(word).replace('/', " "))
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `["a", "b", "c"]` → `a, b, and c`
#[must_use]
pub fn to_sentence(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}
