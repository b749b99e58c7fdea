// src/refine/prompt.rs - Instruction text sent to the ranking model
use crate::models::records::{Candidate, Record};

/// Builds the product-aware ranking prompt for one DE record and its top
/// candidates. The model is asked for a bare JSON array of
/// `{url, geminiScore, reason}` objects.
pub fn build_ranking_prompt(de: &Record, candidates: &[Candidate]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Você é um especialista em e-commerce e análise semântica de produtos. ");
    prompt.push_str("Sua tarefa é encontrar o MELHOR match semântico entre produtos, considerando categoria, tipo e características.\n\n");
    prompt.push_str("ANÁLISE CRÍTICA: Evite matches inadequados como \"blusa\" → \"bermuda\" ou \"sapato\" → \"óculos\". ");
    prompt.push_str("Foque na SEMELHANÇA REAL do produto.\n\n");

    prompt.push_str("URL DE (origem):\n");
    push_record(&mut prompt, de, "- ");

    prompt.push_str("\nURLs Candidatas RASTREIO:\n");
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("\n{}. URL: {}\n", i + 1, candidate.url()));
        push_fields(&mut prompt, &candidate.record, "   - ");
        prompt.push_str(&format!("   - Score atual: {:.1}%\n", candidate.score * 100.0));
    }

    prompt.push_str("\nCRITÉRIOS DE ANÁLISE:\n");
    prompt.push_str("1. **CATEGORIA DO PRODUTO**: Mesmo tipo de produto (roupa, calçado, acessório)\n");
    prompt.push_str("2. **FUNÇÃO**: Mesmo propósito ou uso\n");
    prompt.push_str("3. **CARACTERÍSTICAS**: Materiais, estilo, cor similares\n");
    prompt.push_str("4. **CONTEXTO**: Público-alvo e ocasião de uso\n\n");

    prompt.push_str("REGRAS IMPORTANTES:\n");
    prompt.push_str("- ❌ NUNCA match \"blusa\" com \"bermuda\" (tipos diferentes)\n");
    prompt.push_str("- ❌ NUNCA match \"sapato\" com \"óculos\" (categorias diferentes)\n");
    prompt.push_str("- ❌ NUNCA match \"calça\" com \"tênis\" (tipos diferentes)\n");
    prompt.push_str("- ✅ SIM match \"blusa\" com \"camiseta\" (mesmo tipo)\n");
    prompt.push_str("- ✅ SIM match \"sapato esportivo\" com \"tênis\" (mesmo propósito)\n");
    prompt.push_str("- ✅ SIM match \"óculos\" com \"óculos\" (mesmo produto)\n\n");
    prompt.push_str("PENALIZE matches inadequados com score baixo (0.0-0.3).\n");
    prompt.push_str("PREMIE matches semânticos corretos com score alto (0.7-1.0).\n\n");

    prompt.push_str("Responda APENAS no formato JSON abaixo, sem texto adicional:\n");
    prompt.push_str("[\n  {\n    \"url\": \"url_da_candidata\",\n    \"geminiScore\": 0.95,\n");
    prompt.push_str("    \"reason\": \"Explicação detalhada do match semântico\"\n  }\n]\n\n");

    prompt.push_str("Score deve ser entre 0.0 e 1.0, sendo:\n");
    prompt.push_str("- 0.9-1.0: Match perfeito (mesmo produto/categoria)\n");
    prompt.push_str("- 0.7-0.8: Match bom (produtos similares)\n");
    prompt.push_str("- 0.5-0.6: Match moderado (categoria relacionada)\n");
    prompt.push_str("- 0.3-0.4: Match fraco (pouca semelhança)\n");
    prompt.push_str("- 0.0-0.2: Match inadequado (categorias diferentes)\n");

    prompt
}

fn push_record(prompt: &mut String, record: &Record, indent: &str) {
    prompt.push_str(&format!("{}URL: {}\n", indent, record.url));
    push_fields(prompt, record, indent);
}

fn push_fields(prompt: &mut String, record: &Record, indent: &str) {
    prompt.push_str(&format!("{}Slug: {}\n", indent, record.slug));
    prompt.push_str(&format!("{}Meta Title: {}\n", indent, record.meta_title));
    prompt.push_str(&format!("{}Meta Description: {}\n", indent, record.meta_description));
    prompt.push_str(&format!("{}H1: {}\n", indent, record.h1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::FieldScores;

    fn record(url: &str, slug: &str) -> Record {
        Record {
            url: url.to_string(),
            slug: slug.to_string(),
            meta_title: format!("Title {}", slug),
            ..Record::default()
        }
    }

    #[test]
    fn test_prompt_lists_de_and_numbered_candidates() {
        let de = record("/a", "blusa-azul");
        let candidates = vec![
            Candidate::new(record("/b", "camiseta-azul"), 0.9234, FieldScores::default()),
            Candidate::new(record("/c", "blusa-verde"), 0.8, FieldScores::default()),
        ];
        let prompt = build_ranking_prompt(&de, &candidates);

        assert!(prompt.contains("- URL: /a\n- Slug: blusa-azul\n"));
        assert!(prompt.contains("1. URL: /b\n"));
        assert!(prompt.contains("2. URL: /c\n"));
        assert!(prompt.contains("   - Score atual: 92.3%\n"));
        assert!(prompt.contains("   - Score atual: 80.0%\n"));
        assert!(prompt.contains("\"geminiScore\""));
    }
}
