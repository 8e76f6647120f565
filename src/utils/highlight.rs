use crate::model::Attributes;

/// Attribute keys in display priority, with their badge label.
const PRIORITY: [(&str, &str); 11] = [
    ("romantic", "💕 Ótimo para casais"),
    ("good_for_birthdays", "🎂 Bom para aniversários"),
    ("live_music", "🎵 Som ao Vivo"),
    ("pet_friendly", "🐾 Aceita Pets"),
    ("kids_friendly", "🧸 Espaço Kids"),
    ("outdoor_seating", "🌿 Área Externa Aberta"),
    ("vegan_options", "🌱 Opções Veganas"),
    ("upscale", "✨ Experiência Premium"),
    ("wheelchair_accessible", "♿️ Acessibilidade Física"),
    ("parking_available", "🅿️ Estacionamento Fácil"),
    ("delivery", "🛵 Faz Entrega"),
];

/// The single most prominent badge for a restaurant, if any attribute
/// on the priority list is set.
pub fn prominent(attributes: &Attributes) -> Option<&'static str> {
    PRIORITY
        .iter()
        .find(|(key, _)| attributes.is_set(key))
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prominent_follows_priority() {
        let mut attrs = Attributes::all_false();
        assert_eq!(prominent(&attrs), None);

        attrs.set("delivery", true);
        attrs.set("pet_friendly", true);
        assert_eq!(prominent(&attrs), Some("🐾 Aceita Pets"));

        attrs.set("romantic", true);
        assert_eq!(prominent(&attrs), Some("💕 Ótimo para casais"));
    }
}
