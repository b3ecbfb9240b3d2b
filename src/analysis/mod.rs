//! 計測・動作確認用のユーティリティ群。
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::classification::{Category, TopicClassifier};

/// 動作確認用の見出し。カテゴリごとに 4 件ずつ。
pub const SAMPLE_HEADLINES: [&str; 12] = [
    // Deportes
    "El Barcelona ganó 3-0 contra el Real Madrid en el clásico de liga española",
    "Messi anota hat-trick en la final de la Champions League ante el PSG",
    "La selección nacional de fútbol se prepara para el mundial de 2026",
    "El equipo de baloncesto Lakers ganó el campeonato con una jugada espectacular",
    // Política
    "El presidente anunció nuevas medidas económicas para combatir la inflación",
    "El congreso debate la reforma fiscal para el próximo año fiscal",
    "Ministro de economía anuncia plan de estabilización monetaria",
    "El gobierno aprueba nueva ley de educación para reformar el sistema",
    // Tecnología
    "Nuevo iPhone 15 con inteligencia artificial revolucionaria y mejoras en la cámara",
    "Google presenta avances en computación cuántica con nuevo procesador",
    "Microsoft lanza Windows 12 con funciones de IA integradas y mejor seguridad",
    "Facebook anuncia metaverso con realidad virtual mejorada para usuarios",
];

/// サンプル見出しを所有文字列で返す。
#[must_use]
pub fn sample_documents() -> Vec<String> {
    SAMPLE_HEADLINES.iter().map(ToString::to_string).collect()
}

/// 合成見出しを生成する。シードは固定なので同じ `count` なら同じ結果になる。
#[must_use]
pub fn synthetic_documents(count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    let templates = [
        "{team} logra una {result} en el estadio con un gol de su {player}",
        "El {office} presenta la reforma {area} ante el senado",
        "{company} lanza un nuevo {product} con inteligencia artificial",
        "Vecinos de {city} celebran la feria anual del barrio",
    ];

    let replacements = [
        ("team", ["El Barcelona", "El Betis", "Boca", "River"].as_ref()),
        ("result", ["victoria", "remontada", "derrota"].as_ref()),
        ("player", ["portero", "delantero", "capitán"].as_ref()),
        ("office", ["presidente", "ministro", "gobernador"].as_ref()),
        ("area", ["fiscal", "educativa", "laboral", "sanitaria"].as_ref()),
        ("company", ["Google", "Samsung", "Tesla", "Microsoft"].as_ref()),
        ("product", ["procesador", "software", "robot", "chip"].as_ref()),
        ("city", ["Sevilla", "Lima", "Rosario", "Valencia"].as_ref()),
    ];

    let mut documents = Vec::with_capacity(count);
    for idx in 0..count {
        let mut document = templates[rng.random_range(0..templates.len())].to_string();
        for (key, options) in &replacements {
            let choice = options[rng.random_range(0..options.len())];
            document = document.replace(&format!("{{{key}}}"), choice);
        }
        documents.push(format!("{document} {idx}"));
    }
    documents
}

/// 文書群を個別分類し、カテゴリごとの件数を列挙順で返す。
#[must_use]
pub fn category_histogram(classifier: &TopicClassifier, documents: &[String]) -> [usize; Category::COUNT] {
    let mut histogram = [0usize; Category::COUNT];
    for document in documents {
        histogram[classifier.classify(document).index()] += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_split_evenly_across_categories() {
        let histogram = category_histogram(&TopicClassifier::default(), &sample_documents());
        assert_eq!(histogram, [4, 4, 4]);
    }

    #[test]
    fn synthetic_documents_are_deterministic() {
        let first = synthetic_documents(32);
        let second = synthetic_documents(32);
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first[5].ends_with(" 5"));
    }
}
