use std::collections::HashMap;

use lazy_static::lazy_static;

use super::EntityKind;

lazy_static! {
    /// Canonical condition, process and outcome terms, keyed by normalized label.
    static ref VOCABULARY: HashMap<&'static str, EntityKind> = {
        let mut m = HashMap::new();
        for term in [
            "microgravity", "simulated microgravity", "spaceflight", "spaceflight environment",
            "radiation", "space radiation", "cosmic radiation", "hypergravity",
            "confined environment", "altered gravity", "altered gravity vector", "fluid shifts",
            "isolation", "hypoxia", "altered nutrition", "temperature variations",
            "muscle unloading",
        ] {
            m.insert(term, EntityKind::Condition);
        }
        for term in [
            "gene expression", "protein degradation", "cell differentiation", "gravitropism",
            "root growth", "stress response", "calcium metabolism", "metabolism",
            "immune response", "dna repair", "oxidative stress", "bone remodeling",
            "development", "reproduction", "adaptation", "space adaptation", "transcription",
            "apoptosis", "cell proliferation",
        ] {
            m.insert(term, EntityKind::Process);
        }
        for term in [
            "muscle atrophy", "bone loss", "bone density loss", "neural changes",
            "cardiovascular deconditioning", "immune dysfunction", "osteoporosis",
            "oxidative damage", "dna damage",
        ] {
            m.insert(term, EntityKind::Outcome);
        }
        m
    };

    /// Common names and genus-only forms mapped to the binomial label.
    static ref ORGANISM_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("arabidopsis", "arabidopsis thaliana");
        m.insert("thale cress", "arabidopsis thaliana");
        m.insert("mouse", "mus musculus");
        m.insert("mice", "mus musculus");
        m.insert("human", "homo sapiens");
        m.insert("humans", "homo sapiens");
        m.insert("rat", "rattus norvegicus");
        m.insert("rats", "rattus norvegicus");
        m.insert("e coli", "escherichia coli");
        m.insert("fruit fly", "drosophila melanogaster");
        m.insert("drosophila", "drosophila melanogaster");
        m.insert("yeast", "saccharomyces cerevisiae");
        m.insert("c elegans", "caenorhabditis elegans");
        m
    };
}

/// Looks up an already-normalized term.
pub fn classify_term(label: &str) -> Option<EntityKind> {
    VOCABULARY.get(label).copied()
}


pub fn canonical_organism(label: &str) -> &str {
    ORGANISM_ALIASES.get(label).copied().unwrap_or(label)
}


pub fn vocabulary_size() -> usize {
    VOCABULARY.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_kinds() {
        assert_eq!(classify_term("microgravity"), Some(EntityKind::Condition));
        assert_eq!(classify_term("gene expression"), Some(EntityKind::Process));
        assert_eq!(classify_term("muscle atrophy"), Some(EntityKind::Outcome));
        assert_eq!(classify_term("Microgravity"), None);
        assert_eq!(classify_term("plants"), None);
        assert!(vocabulary_size() > 40);
    }

    #[test]
    fn test_organism_aliases() {
        assert_eq!(canonical_organism("arabidopsis"), "arabidopsis thaliana");
        assert_eq!(canonical_organism("e coli"), "escherichia coli");
        assert_eq!(canonical_organism("brassica rapa"), "brassica rapa");
    }
}
