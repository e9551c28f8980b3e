//! OCTGN `.o8d` deck lists

use deck_model::CardKind;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use super::set_xml::{XML_DECLARATION, attr, required_attr, xml_error};
use crate::types::{ExportError, Result};

/// Player sections known to OCTGN
const PLAYER_SECTIONS: [&str; 5] = ["Cards", "PreBuiltCards", "Special", "Nemesis", "Setup"];

/// Sections shared by all players
const GLOBAL_SECTIONS: [&str; 9] = [
    "Encounter",
    "Side",
    "Special",
    "Villain",
    "Scheme",
    "Campaign",
    "Removed",
    "Setup",
    "Recommended",
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeckList {
    pub game_id: String,
    pub sections: Vec<DeckSection>,
    /// Free text of the `<notes>` element
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeckSection {
    pub name: String,
    pub shared: bool,
    pub cards: Vec<DeckListCard>,
}

/// One `<card>` line: `qty` copies of a card, optionally on its alternate face
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeckListCard {
    pub id: String,
    pub qty: usize,
    pub alternate: bool,
    pub name: String,
}

impl DeckList {
    /// Card lines in document order
    pub fn cards(&self) -> impl Iterator<Item = (&DeckSection, &DeckListCard)> {
        self.sections
            .iter()
            .flat_map(|s| s.cards.iter().map(move |c| (s, c)))
    }

    pub fn card_count(&self) -> usize {
        self.cards().map(|(_, c)| c.qty).sum()
    }
}

/// Section (name, shared) a card kind is listed under
pub fn section_for(kind: CardKind) -> (&'static str, bool) {
    match kind {
        CardKind::Player => ("Cards", false),
        CardKind::Encounter => ("Encounter", true),
        CardKind::Villain => ("Villain", true),
        CardKind::Unspecified => ("Special", false),
    }
}

/// Card kind implied by a section
pub fn kind_for(section: &str, shared: bool) -> CardKind {
    match (section, shared) {
        ("Special", false) => CardKind::Unspecified,
        ("Villain", true) => CardKind::Villain,
        (_, true) => CardKind::Encounter,
        (_, false) => CardKind::Player,
    }
}

// =============================================================================
// Writing
// =============================================================================

pub fn write_o8d(deck: &DeckList) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    xml.push_str(&format!("<deck game=\"{}\">\n", escape(deck.game_id.as_str())));
    for section in &deck.sections {
        xml.push_str(&format!(
            "  <section name=\"{}\" shared=\"{}\">\n",
            escape(section.name.as_str()),
            if section.shared { "True" } else { "False" }
        ));
        for card in &section.cards {
            xml.push_str(&format!(
                "    <card qty=\"{}\" id=\"{}\"",
                card.qty,
                escape(card.id.as_str())
            ));
            if card.alternate {
                xml.push_str(" alternate=\"b\"");
            }
            xml.push_str(&format!(">{}</card>\n", escape(card.name.as_str())));
        }
        xml.push_str("  </section>\n");
    }
    if let Some(notes) = &deck.notes {
        xml.push_str(&format!("  <notes>{}</notes>\n", escape(notes.as_str())));
    }
    xml.push_str("</deck>\n");
    xml
}

// =============================================================================
// Parsing
// =============================================================================

enum TextTarget {
    None,
    Card,
    Notes,
}

pub fn parse_o8d(xml: &str) -> Result<DeckList> {
    let mut reader = Reader::from_str(xml);
    let mut deck: Option<DeckList> = None;
    let mut target = TextTarget::None;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"deck" => {
                        deck = Some(DeckList {
                            game_id: required_attr(e, "game")?,
                            ..DeckList::default()
                        });
                    }
                    b"section" => {
                        let name = required_attr(e, "name")?;
                        let shared = match required_attr(e, "shared")?.to_ascii_lowercase().as_str()
                        {
                            "true" => true,
                            "false" => false,
                            other => {
                                return Err(ExportError::Xml(format!(
                                    "section '{}' has invalid shared value '{}'",
                                    name, other
                                )));
                            }
                        };
                        let known: &[&str] = if shared {
                            &GLOBAL_SECTIONS
                        } else {
                            &PLAYER_SECTIONS
                        };
                        if !known.contains(&name.as_str()) {
                            return Err(ExportError::Xml(format!("unknown section '{}'", name)));
                        }
                        open_deck(&mut deck)?.sections.push(DeckSection {
                            name,
                            shared,
                            cards: Vec::new(),
                        });
                    }
                    b"card" => {
                        let qty = required_attr(e, "qty")?;
                        let qty: usize = qty
                            .parse()
                            .ok()
                            .filter(|q| *q > 0)
                            .ok_or_else(|| ExportError::Xml(format!("invalid qty '{}'", qty)))?;
                        let card = DeckListCard {
                            id: required_attr(e, "id")?,
                            qty,
                            alternate: attr(e, "alternate")?.as_deref() == Some("b"),
                            name: String::new(),
                        };
                        open_deck(&mut deck)?
                            .sections
                            .last_mut()
                            .ok_or_else(|| ExportError::Xml("<card> outside <section>".into()))?
                            .cards
                            .push(card);
                        if !empty {
                            target = TextTarget::Card;
                        }
                    }
                    b"notes" => {
                        open_deck(&mut deck)?.notes = Some(String::new());
                        if !empty {
                            target = TextTarget::Notes;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(xml_error)?;
                let Some(deck) = deck.as_mut() else {
                    continue;
                };
                match target {
                    TextTarget::Card => {
                        if let Some(card) = deck
                            .sections
                            .last_mut()
                            .and_then(|s| s.cards.last_mut())
                        {
                            card.name.push_str(&text);
                        }
                    }
                    TextTarget::Notes => {
                        if let Some(notes) = deck.notes.as_mut() {
                            notes.push_str(&text);
                        }
                    }
                    TextTarget::None => {}
                }
            }
            Event::End(_) => target = TextTarget::None,
            Event::Eof => break,
            _ => {}
        }
    }

    deck.ok_or_else(|| ExportError::Xml("missing <deck> element".into()))
}

fn open_deck(deck: &mut Option<DeckList>) -> Result<&mut DeckList> {
    deck.as_mut()
        .ok_or_else(|| ExportError::Xml("element outside <deck>".into()))
}
