//! Conversational funnel templates.
//!
//! A template is an ordered list of stages; each stage carries content
//! blocks (some editable, some fixed) and ordered conversational steps
//! with the callable functions available at that point. The catalog is
//! read-only: the analysis pipeline fills a deep copy and never mutates
//! the originals. Filling may change only the `block_content` of editable
//! blocks and the `text` of steps - identifiers, numbering, functions,
//! ordering, and non-editable blocks survive untouched.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub identifier: String,
    pub blocks: Vec<Block>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_identifier: String,
    pub block_content: String,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub number: u32,
    pub text: String,
    pub functions: Vec<String>,
}

/// Per-stage replacement content produced by the model.
///
/// Unknown identifiers and step numbers are ignored when applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageFill {
    #[serde(default)]
    pub blocks: Vec<BlockFill>,
    #[serde(default)]
    pub steps: Vec<StepFill>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockFill {
    pub block_identifier: String,
    pub block_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepFill {
    pub number: u32,
    pub text: String,
}

/// Look up a template by id.
pub fn get(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|t| t.id == id)
}

/// Ids of every catalog template.
pub fn ids() -> Vec<&'static str> {
    CATALOG.iter().map(|t| t.id.as_str()).collect()
}

/// Apply model-produced content onto a copy of `stage`.
///
/// Only editable blocks and step texts can change; everything else is
/// cloned from the source stage as-is.
pub fn apply_fill(stage: &Stage, fill: &StageFill) -> Stage {
    let mut filled = stage.clone();
    for block in filled.blocks.iter_mut().filter(|b| b.editable) {
        if let Some(update) = fill
            .blocks
            .iter()
            .find(|f| f.block_identifier == block.block_identifier)
        {
            block.block_content = update.block_content.clone();
        }
    }
    for step in filled.steps.iter_mut() {
        if let Some(update) = fill.steps.iter().find(|f| f.number == step.number) {
            step.text = update.text.clone();
        }
    }
    filled
}

fn block(identifier: &str, content: &str, editable: bool) -> Block {
    Block {
        block_identifier: identifier.to_string(),
        block_content: content.to_string(),
        editable,
    }
}

fn step(number: u32, text: &str, functions: &[&str]) -> Step {
    Step {
        number,
        text: text.to_string(),
        functions: functions.iter().map(|f| f.to_string()).collect(),
    }
}

fn stage(identifier: &str, blocks: Vec<Block>, steps: Vec<Step>) -> Stage {
    Stage {
        identifier: identifier.to_string(),
        blocks,
        steps,
    }
}

lazy_static! {
    static ref CATALOG: Vec<Template> = vec![
        Template {
            id: "barberia".to_string(),
            name: "Barbería".to_string(),
            stages: vec![
                stage(
                    "bienvenida",
                    vec![
                        block(
                            "presentacion",
                            "Eres el asistente virtual de la barbería. Saluda con calidez y preséntate brevemente.",
                            true,
                        ),
                        block(
                            "tono",
                            "Tono cercano y profesional; trata al cliente de tú.",
                            true,
                        ),
                        block(
                            "politica_horario",
                            "Atiende consultas únicamente dentro del horario configurado por el negocio.",
                            false,
                        ),
                    ],
                    vec![
                        step(1, "Saluda al cliente y pregunta en qué puedes ayudarle.", &[]),
                        step(
                            2,
                            "Si pide una cita, pregunta el servicio y el día preferido.",
                            &["consultar_disponibilidad"],
                        ),
                        step(
                            3,
                            "Confirma la cita y registra los datos del cliente.",
                            &["agendar_cita", "registrar_cliente"],
                        ),
                    ],
                ),
                stage(
                    "servicios",
                    vec![
                        block(
                            "catalogo_servicios",
                            "Describe los servicios de la barbería con sus precios.",
                            true,
                        ),
                        block(
                            "promociones",
                            "Menciona las promociones vigentes si el cliente muestra interés.",
                            true,
                        ),
                    ],
                    vec![
                        step(1, "Responde dudas sobre servicios y precios.", &[]),
                        step(
                            2,
                            "Sugiere el servicio más adecuado según lo que pida el cliente.",
                            &[],
                        ),
                    ],
                ),
                stage(
                    "cierre",
                    vec![block(
                        "despedida",
                        "Agradece la visita en nombre de la barbería e invita a volver.",
                        true,
                    )],
                    vec![
                        step(1, "Agradece la conversación y despídete.", &[]),
                        step(
                            2,
                            "Si quedó una cita pendiente, recuérdala antes de despedirte.",
                            &["consultar_disponibilidad"],
                        ),
                    ],
                ),
            ],
        },
        Template {
            id: "ecommerce".to_string(),
            name: "Tienda en línea".to_string(),
            stages: vec![
                stage(
                    "bienvenida",
                    vec![
                        block(
                            "presentacion",
                            "Eres el asistente de la tienda en línea. Saluda y ofrece ayuda con productos o pedidos.",
                            true,
                        ),
                        block(
                            "politica_datos",
                            "No solicites datos de pago dentro del chat bajo ninguna circunstancia.",
                            false,
                        ),
                    ],
                    vec![
                        step(1, "Saluda al cliente y pregunta qué está buscando.", &[]),
                        step(
                            2,
                            "Si busca un producto, ayúdale a encontrarlo en el catálogo.",
                            &["buscar_producto"],
                        ),
                    ],
                ),
                stage(
                    "catalogo",
                    vec![
                        block(
                            "descripcion_tienda",
                            "Describe qué vende la tienda y sus categorías principales.",
                            true,
                        ),
                        block(
                            "envios",
                            "Explica las opciones de envío y sus tiempos estimados.",
                            true,
                        ),
                    ],
                    vec![
                        step(
                            1,
                            "Recomienda productos según lo que el cliente describe.",
                            &["buscar_producto"],
                        ),
                        step(2, "Informa disponibilidad y precios cuando te lo pidan.", &[]),
                    ],
                ),
                stage(
                    "postventa",
                    vec![block(
                        "politica_devoluciones",
                        "Resume la política de cambios y devoluciones de la tienda.",
                        true,
                    )],
                    vec![
                        step(
                            1,
                            "Si preguntan por un pedido, consulta su estado con el número de orden.",
                            &["estado_pedido"],
                        ),
                        step(
                            2,
                            "Si no puedes resolver el caso, ofrece pasar con una persona del equipo.",
                            &["escalar_a_humano"],
                        ),
                    ],
                ),
            ],
        },
        Template {
            id: "basic".to_string(),
            name: "Básico".to_string(),
            stages: vec![
                stage(
                    "bienvenida",
                    vec![block(
                        "presentacion",
                        "Eres el asistente virtual del negocio. Saluda y ofrece ayuda.",
                        true,
                    )],
                    vec![step(1, "Saluda al cliente y pregunta en qué puedes ayudarle.", &[])],
                ),
                stage(
                    "informacion",
                    vec![
                        block(
                            "descripcion_negocio",
                            "Describe a qué se dedica el negocio y qué ofrece.",
                            true,
                        ),
                        block(
                            "contacto",
                            "Comparte horario, ubicación y medios de contacto del negocio.",
                            true,
                        ),
                    ],
                    vec![
                        step(1, "Responde preguntas sobre el negocio con la información disponible.", &[]),
                        step(
                            2,
                            "Si no tienes la respuesta, indica cómo contactar directamente al negocio.",
                            &[],
                        ),
                    ],
                ),
            ],
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_the_three_known_templates() {
        assert_eq!(ids(), vec!["barberia", "ecommerce", "basic"]);
    }

    #[test]
    fn unknown_template_id_is_none() {
        assert!(get("peluqueria").is_none());
    }

    #[test]
    fn every_stage_has_blocks_and_steps() {
        for id in ids() {
            let template = get(id).unwrap();
            assert!(!template.stages.is_empty(), "{id} has no stages");
            for stage in &template.stages {
                assert!(!stage.blocks.is_empty(), "{id}/{} has no blocks", stage.identifier);
                assert!(!stage.steps.is_empty(), "{id}/{} has no steps", stage.identifier);
            }
        }
    }

    #[test]
    fn step_numbers_are_sequential_from_one() {
        for id in ids() {
            for stage in &get(id).unwrap().stages {
                for (index, step) in stage.steps.iter().enumerate() {
                    assert_eq!(step.number as usize, index + 1);
                }
            }
        }
    }

    #[test]
    fn apply_fill_replaces_editable_content_only() {
        let stage = &get("barberia").unwrap().stages[0];
        let fill = StageFill {
            blocks: vec![
                BlockFill {
                    block_identifier: "presentacion".to_string(),
                    block_content: "Bienvenido a Barbería El Clásico.".to_string(),
                },
                BlockFill {
                    block_identifier: "politica_horario".to_string(),
                    block_content: "debería ignorarse".to_string(),
                },
            ],
            steps: vec![StepFill {
                number: 1,
                text: "Saluda mencionando el nombre de la barbería.".to_string(),
            }],
        };

        let filled = apply_fill(stage, &fill);

        assert_eq!(filled.blocks[0].block_content, "Bienvenido a Barbería El Clásico.");
        // non-editable block keeps its original content
        assert_eq!(filled.blocks[2].block_content, stage.blocks[2].block_content);
        assert_eq!(filled.steps[0].text, "Saluda mencionando el nombre de la barbería.");
        assert_eq!(filled.steps[1].text, stage.steps[1].text);
    }

    #[test]
    fn apply_fill_preserves_structure() {
        let stage = &get("ecommerce").unwrap().stages[2];
        let fill = StageFill {
            blocks: vec![BlockFill {
                block_identifier: "politica_devoluciones".to_string(),
                block_content: "Cambios dentro de 30 días con ticket.".to_string(),
            }],
            steps: vec![StepFill {
                number: 2,
                text: "Ofrece escalar el caso al equipo de soporte.".to_string(),
            }],
        };

        let filled = apply_fill(stage, &fill);

        assert_eq!(filled.identifier, stage.identifier);
        assert_eq!(filled.blocks.len(), stage.blocks.len());
        assert_eq!(filled.steps.len(), stage.steps.len());
        for (filled_block, original) in filled.blocks.iter().zip(&stage.blocks) {
            assert_eq!(filled_block.block_identifier, original.block_identifier);
            assert_eq!(filled_block.editable, original.editable);
        }
        for (filled_step, original) in filled.steps.iter().zip(&stage.steps) {
            assert_eq!(filled_step.number, original.number);
            assert_eq!(filled_step.functions, original.functions);
        }
    }

    #[test]
    fn apply_fill_with_unknown_identifiers_is_a_no_op() {
        let stage = &get("basic").unwrap().stages[0];
        let fill = StageFill {
            blocks: vec![BlockFill {
                block_identifier: "no_existe".to_string(),
                block_content: "nada".to_string(),
            }],
            steps: vec![StepFill {
                number: 99,
                text: "nada".to_string(),
            }],
        };

        assert_eq!(&apply_fill(stage, &fill), stage);
    }

    #[test]
    fn stage_fill_parses_with_missing_sections() {
        let fill: StageFill = serde_json::from_str(r#"{"blocks": []}"#).unwrap();
        assert!(fill.blocks.is_empty());
        assert!(fill.steps.is_empty());
    }
}
