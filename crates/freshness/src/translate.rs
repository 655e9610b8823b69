//! Presentation-time translation of analysis text.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{BatchResult, ItemAnalysis, NutritionInfo};

pub const SOURCE_LANGUAGE: &str = "en";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Rewrites the textual fields of a batch into another language. The input
/// is left untouched; structure, scores and indices are preserved.
pub trait Translator: Send + Sync {
    fn translate(&self, batch: &BatchResult, language: &str) -> Result<BatchResult, TranslateError>;
}

const ES: &[(&str, &str)] = &[
    ("Apple", "Manzana"), ("Pear", "Pera"), ("Banana", "Plátano"), ("Orange", "Naranja"),
    ("Grape", "Uva"), ("Strawberry", "Fresa"), ("Mango", "Mango"), ("Pineapple", "Piña"),
    ("Watermelon", "Sandía"), ("Peach", "Durazno"), ("Cherry", "Cereza"), ("Avocado", "Aguacate"),
    ("Lemon", "Limón"), ("Lime", "Lima"), ("Tomato", "Tomate"), ("Cucumber", "Pepino"),
    ("Carrot", "Zanahoria"), ("Potato", "Papa"), ("Onion", "Cebolla"), ("Garlic", "Ajo"),
    ("Produce Item", "Producto"),
    ("green", "verde"), ("red", "rojo"), ("yellow", "amarillo"), ("purple", "morado"),
    ("brown", "marrón"), ("white", "blanco"),
    ("fresh", "fresco"), ("ripe", "maduro"), ("excellent", "excelente"), ("good", "bueno"),
    ("fair", "regular"), ("poor", "malo"),
    ("buy", "comprar"), ("check", "revisar"), ("avoid", "evitar"),
    ("Store in refrigerator", "Guardar en refrigerador"), ("days", "días"),
];

const FR: &[(&str, &str)] = &[
    ("Apple", "Pomme"), ("Pear", "Poire"), ("Banana", "Banane"), ("Orange", "Orange"),
    ("Grape", "Raisin"), ("Strawberry", "Fraise"), ("Mango", "Mangue"), ("Pineapple", "Ananas"),
    ("Watermelon", "Pastèque"), ("Peach", "Pêche"), ("Cherry", "Cerise"), ("Avocado", "Avocat"),
    ("Lemon", "Citron"), ("Lime", "Citron vert"), ("Tomato", "Tomate"), ("Cucumber", "Concombre"),
    ("Carrot", "Carotte"), ("Potato", "Pomme de terre"), ("Onion", "Oignon"), ("Garlic", "Ail"),
    ("Produce Item", "Produit"),
    ("green", "vert"), ("red", "rouge"), ("yellow", "jaune"), ("purple", "violet"),
    ("brown", "marron"), ("white", "blanc"),
    ("fresh", "frais"), ("ripe", "mûr"), ("excellent", "excellent"), ("good", "bon"),
    ("fair", "moyen"), ("poor", "médiocre"),
    ("buy", "acheter"), ("check", "vérifier"), ("avoid", "éviter"),
    ("Store in refrigerator", "Conserver au réfrigérateur"), ("days", "jours"),
];

const ZH: &[(&str, &str)] = &[
    ("Apple", "苹果"), ("Pear", "梨"), ("Banana", "香蕉"), ("Orange", "橙子"), ("Grape", "葡萄"),
    ("Strawberry", "草莓"), ("Blueberry", "蓝莓"), ("Mango", "芒果"), ("Pineapple", "菠萝"),
    ("Watermelon", "西瓜"), ("Peach", "桃子"), ("Plum", "李子"), ("Cherry", "樱桃"),
    ("Kiwi", "猕猴桃"), ("Avocado", "牛油果"), ("Lemon", "柠檬"), ("Lime", "青柠"),
    ("Tomato", "西红柿"), ("Cucumber", "黄瓜"), ("Carrot", "胡萝卜"), ("Potato", "土豆"),
    ("Broccoli", "西兰花"), ("Lettuce", "生菜"), ("Produce Item", "果蔬"),
    ("green", "绿色"), ("red", "红色"), ("yellow", "黄色"), ("purple", "紫色"),
    ("brown", "棕色"), ("white", "白色"), ("bright", "鲜艳"), ("vibrant", "鲜明"),
    ("smooth", "光滑"), ("soft", "柔软"), ("firm", "结实"), ("crisp", "脆嫩"),
    ("fresh", "新鲜"), ("ripe", "成熟"), ("overripe", "过熟"), ("spoiled", "变质"),
    ("excellent", "优秀"), ("good", "良好"), ("fair", "一般"), ("poor", "较差"),
    ("buy", "购买"), ("check", "检查"), ("avoid", "避免"),
    ("Store in refrigerator", "冷藏保存"), ("Store in cool, dry place", "存放在阴凉干燥处"),
    ("days", "天"),
];

/// Dictionary translator: whole-word, ASCII case-insensitive replacement,
/// longest term first so phrases win over the words inside them.
pub struct GlossaryTranslator {
    glossaries: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
}

impl GlossaryTranslator {
    pub fn new() -> Self {
        let mut glossaries = HashMap::new();
        for (lang, terms) in [("es", ES), ("fr", FR), ("zh", ZH)] {
            let mut sorted = terms.to_vec();
            sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            glossaries.insert(lang, sorted);
        }
        Self { glossaries }
    }

    pub fn supports(&self, language: &str) -> bool {
        let lang = primary_subtag(language);
        lang == SOURCE_LANGUAGE || self.glossaries.contains_key(lang.as_str())
    }

    pub fn translate_text(&self, text: &str, language: &str) -> Result<String, TranslateError> {
        let lang = primary_subtag(language);
        if lang == SOURCE_LANGUAGE {
            return Ok(text.to_string());
        }
        let glossary = self
            .glossaries
            .get(lang.as_str())
            .ok_or_else(|| TranslateError::UnsupportedLanguage(language.to_string()))?;

        Ok(glossary
            .iter()
            .fold(text.to_string(), |acc, (term, replacement)| replace_word(&acc, term, replacement)))
    }
}

impl Default for GlossaryTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// "es-MX" and "ES_mx" both select "es".
fn primary_subtag(language: &str) -> String {
    language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn replace_word(text: &str, term: &str, replacement: &str) -> String {
    let bytes = text.as_bytes();
    let needle = term.as_bytes();
    if needle.is_empty() || needle.len() > bytes.len() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        let end = i + needle.len();
        let matches = text.is_char_boundary(i)
            && bytes[i..end].eq_ignore_ascii_case(needle)
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && (end == bytes.len() || !is_word_byte(bytes[end]));

        if matches {
            out.push_str(&text[last..i]);
            out.push_str(replacement);
            i = end;
            last = end;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[last..]);
    out
}

impl GlossaryTranslator {
    fn item(&self, item: &ItemAnalysis, lang: &str) -> Result<ItemAnalysis, TranslateError> {
        let t = |s: &str| self.translate_text(s, lang);
        let opt = |s: &Option<String>| s.as_deref().map(t).transpose();

        let mut out = item.clone();
        out.label = t(&item.label)?;
        out.details = t(&item.details)?;
        out.characteristics.color = t(&item.characteristics.color)?;
        out.characteristics.texture = t(&item.characteristics.texture)?;
        out.characteristics.blemishes = t(&item.characteristics.blemishes)?;
        out.characteristics.ripeness = t(&item.characteristics.ripeness)?;
        out.storage_recommendation = opt(&item.storage_recommendation)?;
        out.selection_tips = opt(&item.selection_tips)?;
        out.season_info = opt(&item.season_info)?;
        out.common_uses = opt(&item.common_uses)?;
        out.ripe_timing = opt(&item.ripe_timing)?;
        out.pairings = opt(&item.pairings)?;
        out.medicinal_uses = opt(&item.medicinal_uses)?;
        out.nutrition_info = match &item.nutrition_info {
            Some(n) => Some(NutritionInfo {
                calories: opt(&n.calories)?,
                vitamins: opt(&n.vitamins)?,
                fiber: opt(&n.fiber)?,
                minerals: opt(&n.minerals)?,
                benefits: opt(&n.benefits)?,
            }),
            None => None,
        };
        Ok(out)
    }
}

impl Translator for GlossaryTranslator {
    fn translate(&self, batch: &BatchResult, language: &str) -> Result<BatchResult, TranslateError> {
        if !self.supports(language) {
            return Err(TranslateError::UnsupportedLanguage(language.to_string()));
        }
        let lang = primary_subtag(language);

        let mut out = batch.clone();
        out.items = batch
            .items
            .iter()
            .map(|item| self.item(item, &lang))
            .collect::<Result<_, _>>()?;
        for advice in &mut out.storage_advice {
            advice.label = self.translate_text(&advice.label, &lang)?;
            advice.advice = self.translate_text(&advice.advice, &lang)?;
        }
        out.shopping_recommendation = self.translate_text(&batch.shopping_recommendation, &lang)?;
        out.language = Some(lang);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::assemble;
    use crate::types::{AnalysisSource, Recommendation};
    use chrono::Utc;

    #[test]
    fn whole_words_only() {
        let t = GlossaryTranslator::new();
        assert_eq!(t.translate_text("Apple #2", "es").unwrap(), "Manzana #2");
        assert_eq!(t.translate_text("fresh apple", "es").unwrap(), "fresco Manzana");
        assert_eq!(t.translate_text("Applesauce", "es").unwrap(), "Applesauce");
        assert_eq!(t.translate_text("Pineapple", "fr").unwrap(), "Ananas");
    }

    #[test]
    fn phrases_beat_words() {
        let t = GlossaryTranslator::new();
        assert_eq!(t.translate_text("Store in refrigerator", "fr").unwrap(), "Conserver au réfrigérateur");
    }

    #[test]
    fn region_subtags_are_ignored() {
        let t = GlossaryTranslator::new();
        assert_eq!(t.translate_text("Pear", "es-MX").unwrap(), "Pera");
        assert_eq!(t.translate_text("Pear", "ZH_cn").unwrap(), "梨");
    }

    #[test]
    fn english_is_identity_and_unknown_is_rejected() {
        let t = GlossaryTranslator::new();
        assert_eq!(t.translate_text("Apple", "en").unwrap(), "Apple");
        assert_eq!(
            t.translate_text("Apple", "de"),
            Err(TranslateError::UnsupportedLanguage("de".to_string()))
        );
    }

    #[test]
    fn batch_translation_preserves_structure() {
        let items = vec![
            ItemAnalysis::new("Apple #1", 90, Recommendation::Buy),
            ItemAnalysis::new("Pear #1", 30, Recommendation::Avoid),
        ];
        let batch = assemble(items, AnalysisSource::Primary, Utc::now());

        let translated = GlossaryTranslator::new().translate(&batch, "es").unwrap();

        assert_eq!(translated.items[0].label, "Manzana #1");
        assert_eq!(translated.items[1].label, "Pera #1");
        assert_eq!(translated.storage_advice[0].label, "Manzana #1");
        assert_eq!(translated.items[0].freshness_score, 90);
        assert_eq!(translated.items[0].position, batch.items[0].position);
        assert_eq!(translated.categorization, batch.categorization);
        assert_eq!(translated.ranking, batch.ranking);
        assert_eq!(translated.analysis_id, batch.analysis_id);
        assert_eq!(translated.language.as_deref(), Some("es"));

        // the source batch is untouched
        assert_eq!(batch.items[0].label, "Apple #1");
        assert_eq!(batch.language, None);
    }
}
