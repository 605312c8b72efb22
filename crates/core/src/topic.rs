use serde::{Deserialize, Serialize};

/// A DELE B2 practice topic. Immutable: the catalog is built once at startup
/// and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub vocabulary: Vec<String>,
}

/// The static list of practice topics offered to the student.
pub struct TopicCatalog {
    topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn all(&self) -> &[Topic] {
        &self.topics
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }
}

impl Default for TopicCatalog {
    fn default() -> Self {
        let topic = |id: &str, title: &str, icon: &str, description: &str, vocab: &[&str]| Topic {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            vocabulary: vocab.iter().map(|v| v.to_string()).collect(),
        };

        Self {
            topics: vec![
                topic(
                    "environment",
                    "El Medio Ambiente",
                    "🌍",
                    "Problemas ecológicos, reciclaje, cambio climático y naturaleza.",
                    &[
                        "Sostenibilidad",
                        "Contaminación",
                        "Reciclaje",
                        "Energías renovables",
                        "Cambio climático",
                        "Biodiversidad",
                    ],
                ),
                topic(
                    "technology",
                    "Nuevas Tecnologías",
                    "💻",
                    "El impacto de internet, móviles, redes sociales y el futuro.",
                    &[
                        "Inteligencia artificial",
                        "Digitalización",
                        "Redes sociales",
                        "Automatización",
                        "Ciberseguridad",
                    ],
                ),
                topic(
                    "health",
                    "Salud y Bienestar",
                    "🏥",
                    "Estilos de vida, deporte, alimentación y medicina.",
                    &[
                        "Dieta equilibrada",
                        "Sedentarismo",
                        "Bienestar mental",
                        "Hábitos saludables",
                        "Prevención",
                    ],
                ),
                topic(
                    "work",
                    "El Mundo Laboral",
                    "💼",
                    "Entrevistas, teletrabajo, desempleo y carreras profesionales.",
                    &[
                        "Teletrabajo",
                        "Conciliación",
                        "Productividad",
                        "Cualificación",
                        "Desempleo",
                        "Emprendimiento",
                    ],
                ),
                topic(
                    "travel",
                    "Viajes y Turismo",
                    "✈️",
                    "Vacaciones, turismo sostenible, cultura y experiencias.",
                    &[
                        "Turismo sostenible",
                        "Patrimonio",
                        "Alojamiento",
                        "Destino exótico",
                        "Temporada alta",
                    ],
                ),
                topic(
                    "housing",
                    "Vivienda y Ciudad",
                    "🏘️",
                    "Vida urbana vs rural, problemas de alquiler, convivencia.",
                    &[
                        "Alquiler",
                        "Zona residencial",
                        "Calidad de vida",
                        "Urbanización",
                        "Áreas verdes",
                        "Transporte público",
                    ],
                ),
            ],
        }
    }
}
