//! OCTGN `set.xml` card set documents

use deck_model::CardKind;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::types::{ExportError, Result};

pub(crate) const XML_DECLARATION: &str =
    "<?xml version='1.0' encoding='utf-8' standalone='yes'?>";

/// Properties whose value is carried as element text instead of an attribute
const TEXT_PROPERTIES: [&str; 2] = ["Text", "Quote"];

/// A card set as stored in `set.xml`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardSet {
    pub name: String,
    pub id: String,
    pub game_id: String,
    pub cards: Vec<SetCard>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetCard {
    pub id: String,
    pub name: String,
    /// OCTGN card size name, absent for player-sized cards
    pub size: Option<String>,
    pub properties: Vec<(String, String)>,
    pub alternate: Option<SetAlternate>,
}

impl SetCard {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The `b` side of a double-faced card
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetAlternate {
    pub name: String,
    pub properties: Vec<(String, String)>,
}

/// OCTGN card size for a card kind. Player-sized cards carry no size.
pub fn size_for(kind: CardKind) -> Option<&'static str> {
    match kind {
        CardKind::Encounter => Some("EncounterCard"),
        CardKind::Villain => Some("VillainCard"),
        CardKind::Player | CardKind::Unspecified => None,
    }
}

pub fn kind_for_size(size: Option<&str>) -> CardKind {
    match size {
        Some("EncounterCard") | Some("SchemeCard") => CardKind::Encounter,
        Some("VillainCard") => CardKind::Villain,
        _ => CardKind::Unspecified,
    }
}

// =============================================================================
// Writing
// =============================================================================

pub fn write_set_xml(set: &CardSet) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    xml.push_str(&format!(
        "<set name=\"{}\" id=\"{}\" gameId=\"{}\" gameVersion=\"0.0.0.0\" version=\"1.0.0.0\">\n",
        escape(set.name.as_str()),
        escape(set.id.as_str()),
        escape(set.game_id.as_str())
    ));
    xml.push_str("  <cards>\n");
    for card in &set.cards {
        xml.push_str(&format!(
            "    <card name=\"{}\" id=\"{}\"",
            escape(card.name.as_str()),
            escape(card.id.as_str())
        ));
        if let Some(size) = &card.size {
            xml.push_str(&format!(" size=\"{}\"", escape(size.as_str())));
        }
        if card.properties.is_empty() && card.alternate.is_none() {
            xml.push_str(" />\n");
            continue;
        }
        xml.push_str(">\n");
        write_properties(&mut xml, &card.properties, 6);
        if let Some(alt) = &card.alternate {
            xml.push_str(&format!(
                "      <alternate name=\"{}\" type=\"b\"",
                escape(alt.name.as_str())
            ));
            if alt.properties.is_empty() {
                xml.push_str(" />\n");
            } else {
                xml.push_str(">\n");
                write_properties(&mut xml, &alt.properties, 8);
                xml.push_str("      </alternate>\n");
            }
        }
        xml.push_str("    </card>\n");
    }
    xml.push_str("  </cards>\n");
    xml.push_str("</set>\n");
    xml
}

fn write_properties(xml: &mut String, properties: &[(String, String)], indent: usize) {
    let pad = " ".repeat(indent);
    for (name, value) in properties {
        if TEXT_PROPERTIES.contains(&name.as_str()) {
            xml.push_str(&format!(
                "{}<property name=\"{}\">{}</property>\n",
                pad,
                escape(name.as_str()),
                escape(value.as_str())
            ));
        } else {
            xml.push_str(&format!(
                "{}<property name=\"{}\" value=\"{}\" />\n",
                pad,
                escape(name.as_str()),
                escape(value.as_str())
            ));
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Property being read, waiting for its text content
struct OpenProperty {
    name: String,
    value: Option<String>,
    text: String,
}

pub fn parse_set_xml(xml: &str) -> Result<CardSet> {
    let mut reader = Reader::from_str(xml);
    let mut set: Option<CardSet> = None;
    let mut card: Option<SetCard> = None;
    let mut alternate: Option<SetAlternate> = None;
    let mut property: Option<OpenProperty> = None;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"set" => {
                        set = Some(CardSet {
                            name: required_attr(e, "name")?,
                            id: required_attr(e, "id")?,
                            game_id: required_attr(e, "gameId")?,
                            cards: Vec::new(),
                        });
                    }
                    b"card" => {
                        let parsed = SetCard {
                            id: required_attr(e, "id")?,
                            name: required_attr(e, "name")?,
                            size: attr(e, "size")?,
                            ..SetCard::default()
                        };
                        if empty {
                            push_card(&mut set, parsed)?;
                        } else {
                            card = Some(parsed);
                        }
                    }
                    b"alternate" => {
                        if card.is_none() {
                            return Err(ExportError::Xml("<alternate> outside <card>".into()));
                        }
                        let parsed = SetAlternate {
                            name: required_attr(e, "name")?,
                            properties: Vec::new(),
                        };
                        if empty {
                            if let Some(card) = card.as_mut() {
                                card.alternate = Some(parsed);
                            }
                        } else {
                            alternate = Some(parsed);
                        }
                    }
                    b"property" => {
                        let open = OpenProperty {
                            name: required_attr(e, "name")?,
                            value: attr(e, "value")?,
                            text: String::new(),
                        };
                        if empty {
                            add_property(&mut card, &mut alternate, open)?;
                        } else {
                            property = Some(open);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if let Some(open) = property.as_mut() {
                    open.text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(open) = property.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"property" => {
                    if let Some(open) = property.take() {
                        add_property(&mut card, &mut alternate, open)?;
                    }
                }
                b"alternate" => {
                    if let (Some(card), Some(alt)) = (card.as_mut(), alternate.take()) {
                        card.alternate = Some(alt);
                    }
                }
                b"card" => {
                    if let Some(parsed) = card.take() {
                        push_card(&mut set, parsed)?;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    set.ok_or_else(|| ExportError::Xml("missing <set> element".into()))
}

fn push_card(set: &mut Option<CardSet>, card: SetCard) -> Result<()> {
    set.as_mut()
        .ok_or_else(|| ExportError::Xml("<card> outside <set>".into()))?
        .cards
        .push(card);
    Ok(())
}

fn add_property(
    card: &mut Option<SetCard>,
    alternate: &mut Option<SetAlternate>,
    open: OpenProperty,
) -> Result<()> {
    let value = open.value.unwrap_or(open.text);
    if let Some(alt) = alternate.as_mut() {
        alt.properties.push((open.name, value));
    } else if let Some(card) = card.as_mut() {
        card.properties.push((open.name, value));
    } else {
        return Err(ExportError::Xml(format!(
            "property '{}' outside <card>",
            open.name
        )));
    }
    Ok(())
}

pub(crate) fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match e.try_get_attribute(name).map_err(xml_error)? {
        Some(a) => Ok(Some(a.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

pub(crate) fn required_attr(e: &BytesStart<'_>, name: &str) -> Result<String> {
    attr(e, name)?.ok_or_else(|| {
        ExportError::Xml(format!(
            "<{}> without {} attribute",
            String::from_utf8_lossy(e.name().as_ref()),
            name
        ))
    })
}

pub(crate) fn xml_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Xml(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CardSet {
        CardSet {
            name: "Heroes & Villains".into(),
            id: "a3e1c5c4-1111-4d1e-9c1e-000000000001".into(),
            game_id: crate::constants::MARVEL_CHAMPIONS_GAME_ID.into(),
            cards: vec![
                SetCard {
                    id: "a3e1c5c4-1111-4d1e-9c1e-000000000002".into(),
                    name: "Rhino".into(),
                    size: Some("VillainCard".into()),
                    properties: vec![
                        ("Type".into(), "villain".into()),
                        ("Text".into(), "  Charge <b>3</b>  ".into()),
                    ],
                    alternate: Some(SetAlternate {
                        name: "Rhino II".into(),
                        properties: Vec::new(),
                    }),
                },
                SetCard {
                    id: "a3e1c5c4-1111-4d1e-9c1e-000000000003".into(),
                    name: "\"Quoted\" card".into(),
                    ..SetCard::default()
                },
            ],
        }
    }

    #[test]
    fn test_set_xml_header_is_standalone() {
        let xml = write_set_xml(&sample());
        assert!(xml.starts_with("<?xml version='1.0' encoding='utf-8' standalone='yes'?>"));
        assert!(xml.contains("gameVersion=\"0.0.0.0\" version=\"1.0.0.0\""));
        assert!(xml.contains("<alternate name=\"Rhino II\" type=\"b\" />"));
    }

    #[test]
    fn test_set_xml_parses_back() {
        let set = sample();
        let parsed = parse_set_xml(&write_set_xml(&set)).unwrap();
        assert_eq!(parsed, set);
        // Text properties keep surrounding whitespace
        assert_eq!(parsed.cards[0].property("Text"), Some("  Charge <b>3</b>  "));
    }

    #[test]
    fn test_set_xml_missing_set_rejected() {
        assert!(matches!(
            parse_set_xml("<cards></cards>"),
            Err(ExportError::Xml(_))
        ));
    }

    #[test]
    fn test_card_without_id_rejected() {
        let xml = "<set name=\"x\" id=\"y\" gameId=\"z\"><cards><card name=\"a\" /></cards></set>";
        assert!(parse_set_xml(xml).is_err());
    }
}
