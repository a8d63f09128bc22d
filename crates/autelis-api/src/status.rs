//! The `status.xml` document.
//!
//! The controller answers `GET /status.xml` with a shallow document:
//!
//! ```xml
//! <response>
//!   <system><runstate>50</runstate><opmode>0</opmode>...</system>
//!   <equipment><pump>1</pump><circuit2>0</circuit2><aux5></aux5>...</equipment>
//!   <temp><poolht>1</poolht><htstatus>0</htstatus>...</temp>
//! </response>
//! ```
//!
//! Only this shape is understood: a root, one level of sections, one level
//! of leaf elements. Deeper nesting is skipped. Leaves that are present but
//! empty, or hold only whitespace, are kept as `None`: on the equipment
//! section that marks a circuit the controller knows about but that is not
//! installed.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Expected root element of the status document.
pub const ROOT_TAG: &str = "response";

/// Section holding controller-level fields.
pub const SYSTEM: &str = "system";
/// Section holding temperatures, setpoints and heater settings.
pub const TEMP: &str = "temp";
/// Section holding circuit and feature on/off states.
pub const EQUIPMENT: &str = "equipment";

/// Leaf elements of one section, in document order.
pub type Section = IndexMap<String, Option<String>>;

/// A parsed point-in-time copy of the controller's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    sections: BTreeMap<String, Section>,
}

impl StatusSnapshot {
    /// Parse a status document.
    ///
    /// Fails with [`Error::Xml`] on malformed XML and with
    /// [`Error::UnexpectedRoot`] when the document is not a `<response>`.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut sections: BTreeMap<String, Section> = BTreeMap::new();
        let mut path: Vec<String> = Vec::new();
        let mut text: Option<String> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let name = element_name(start.local_name().as_ref());
                    if path.is_empty() {
                        check_root(&name)?;
                        saw_root = true;
                    } else if path.len() == 1 {
                        sections.entry(name.clone()).or_default();
                    }
                    path.push(name);
                    text = None;
                }
                Event::Empty(empty) => {
                    let name = element_name(empty.local_name().as_ref());
                    match path.len() {
                        0 => {
                            check_root(&name)?;
                            saw_root = true;
                        }
                        1 => {
                            sections.entry(name).or_default();
                        }
                        2 => {
                            if let Some(section) = sections.get_mut(&path[1]) {
                                section.insert(name, None);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(raw) => {
                    if path.len() == 3 {
                        text = Some(raw.unescape()?.into_owned());
                    }
                }
                Event::CData(raw) => {
                    if path.len() == 3 {
                        text = Some(String::from_utf8_lossy(&raw.into_inner()).into_owned());
                    }
                }
                Event::End(_) => {
                    if path.len() == 3 {
                        if let (Some(section), Some(leaf)) = (sections.get_mut(&path[1]), path.last()) {
                            section.insert(leaf.clone(), text.take());
                        }
                    }
                    path.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::UnexpectedRoot { tag: String::new() });
        }

        Ok(Self { sections })
    }

    /// All leaves of a section, or `None` if the document lacks it.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Text of one leaf. Missing and empty leaves both yield `None`.
    pub fn value(&self, section: &str, element: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(element)?
            .as_deref()
    }

    /// Shorthand for a `<system>` leaf.
    pub fn system(&self, element: &str) -> Option<&str> {
        self.value(SYSTEM, element)
    }

    /// Shorthand for a `<temp>` leaf.
    pub fn temp(&self, element: &str) -> Option<&str> {
        self.value(TEMP, element)
    }

    /// Equipment elements that carry a state, in document order.
    ///
    /// Blank elements are circuits the controller does not have installed
    /// and are left out.
    pub fn installed_equipment(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(EQUIPMENT)
            .into_iter()
            .flat_map(|section| section.iter())
            .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
    }

    /// Insert or replace a leaf. Used to build snapshots by hand.
    pub fn set(&mut self, section: &str, element: &str, value: Option<&str>) {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(element.to_owned(), value.map(str::to_owned));
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn check_root(name: &str) -> Result<(), Error> {
    if name == ROOT_TAG {
        Ok(())
    } else {
        Err(Error::UnexpectedRoot {
            tag: name.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const JANDY_STATUS: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<response>
  <system>
    <runstate>50</runstate>
    <model>6524</model>
    <haddr>0</haddr>
    <opmode>0</opmode>
    <freeze>0</freeze>
    <sensor1>0</sensor1>
    <sensor2>0</sensor2>
    <sensor3>0</sensor3>
    <version>1.6.9</version>
  </system>
  <equipment>
    <pump>1</pump>
    <spa>0</spa>
    <aux1>0</aux1>
    <aux2>1</aux2>
    <aux3></aux3>
    <aux4/>
    <solarht>0</solarht>
  </equipment>
  <temp>
    <poolht>1</poolht>
    <spaht>0</spaht>
    <htstatus>1</htstatus>
    <poolsp>82</poolsp>
    <spasp>100</spasp>
    <pooltemp>79</pooltemp>
    <spatemp>0</spatemp>
    <airtemp>71</airtemp>
    <soltemp>0</soltemp>
    <tempunits>F</tempunits>
  </temp>
</response>"#;

    #[test]
    fn parses_sections_and_leaves() {
        let snapshot = StatusSnapshot::parse(JANDY_STATUS).unwrap();

        assert_eq!(snapshot.system("runstate"), Some("50"));
        assert_eq!(snapshot.system("version"), Some("1.6.9"));
        assert_eq!(snapshot.temp("poolsp"), Some("82"));
        assert_eq!(snapshot.temp("tempunits"), Some("F"));
        assert_eq!(snapshot.value(EQUIPMENT, "aux2"), Some("1"));
    }

    #[test]
    fn blank_equipment_is_not_installed() {
        let snapshot = StatusSnapshot::parse(JANDY_STATUS).unwrap();

        let installed: Vec<_> = snapshot.installed_equipment().map(|(name, _)| name).collect();
        assert_eq!(installed, ["pump", "spa", "aux1", "aux2", "solarht"]);

        let equipment = snapshot.section(EQUIPMENT).unwrap();
        assert_eq!(equipment.get("aux3"), Some(&None));
        assert_eq!(equipment.get("aux4"), Some(&None));
    }

    #[test]
    fn whitespace_only_equipment_is_not_installed() {
        let xml = JANDY_STATUS.replace("<aux3></aux3>", "<aux3> \n </aux3>");
        let snapshot = StatusSnapshot::parse(&xml).unwrap();

        assert_eq!(snapshot.value(EQUIPMENT, "aux3"), None);
        assert!(snapshot.installed_equipment().all(|(name, _)| name != "aux3"));
    }

    #[test]
    fn missing_leaf_is_none() {
        let snapshot = StatusSnapshot::parse(JANDY_STATUS).unwrap();
        assert_eq!(snapshot.temp("solarsp"), None);
        assert_eq!(snapshot.system("nonexistent"), None);
        assert!(snapshot.section("chem").is_none());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = StatusSnapshot::parse("<html><body>Login</body></html>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedRoot { ref tag } if tag == "html"));
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = StatusSnapshot::parse("").unwrap_err();
        assert!(matches!(err, Error::UnexpectedRoot { .. }));
    }

    #[test]
    fn unbalanced_document_is_malformed() {
        let err = StatusSnapshot::parse("<response><system><runstate>1</system></response>")
            .unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn entities_are_unescaped() {
        let snapshot =
            StatusSnapshot::parse("<response><system><name>Pool &amp; Spa</name></system></response>")
                .unwrap();
        assert_eq!(snapshot.system("name"), Some("Pool & Spa"));
    }

    #[test]
    fn deeper_nesting_is_ignored() {
        let xml = "<response><equipment><pump>1</pump><lights><l1>1</l1></lights></equipment></response>";
        let snapshot = StatusSnapshot::parse(xml).unwrap();
        let installed: Vec<_> = snapshot.installed_equipment().collect();
        assert_eq!(installed, [("pump", "1")]);
    }
}
