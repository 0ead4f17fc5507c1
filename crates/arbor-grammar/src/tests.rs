use crate::tables::{DEAD_STATE, LexTable, ParseTable};
use crate::*;

/// `source_file -> "a"`, lexing `a` and nothing else.
fn tiny() -> LanguageData {
    let mut byte_classes = [0; 256];
    byte_classes[b'a' as usize] = 1;

    LanguageData {
        version: LANGUAGE_VERSION,
        name: "tiny".to_owned(),
        symbols: vec![
            SymbolInfo::new("end", false, false),
            SymbolInfo::new("a", false, true),
            SymbolInfo::new("source_file", true, true),
        ],
        terminal_count: 2,
        field_names: vec!["body".to_owned()],
        lex: LexTable {
            byte_classes,
            class_count: 2,
            accept: vec![LexAccept::None, LexAccept::Token(Symbol(1))],
            transitions: vec![DEAD_STATE, 1, DEAD_STATE, DEAD_STATE],
            modes: vec![0],
        },
        parse: ParseTable {
            state_count: 3,
            cells: vec![0, 1, 2, 3, 0, 0, 4, 0, 0],
            action_lists: vec![
                vec![],
                vec![ParseAction::Shift(StateId(1))],
                vec![ParseAction::Goto(StateId(2))],
                vec![ParseAction::Reduce(ProductionId(0))],
                vec![ParseAction::Accept],
            ],
            lex_modes: vec![0, 0, 0],
        },
        productions: vec![Production {
            lhs: Symbol(2),
            child_count: 1,
            dynamic_precedence: 0,
            fields: vec![(0, FieldId::new(1).unwrap())],
        }],
        ambiguity: AmbiguityPolicy::FirstAction,
    }
}

fn malformed_section(result: Result<Language, LoadError>) -> &'static str {
    match result {
        Err(LoadError::MalformedTable { section, .. }) => section,
        other => panic!("expected MalformedTable, got {other:?}"),
    }
}

#[test]
fn well_formed_descriptor_loads() {
    let bytes = tiny().encode();
    let language = Language::load(&bytes).unwrap();

    assert_eq!(language.name(), "tiny");
    assert_eq!(language.version(), LANGUAGE_VERSION);
    assert_eq!(language.symbol_count(), 3);
    assert_eq!(language.state_count(), 3);
    assert_eq!(language.symbol_name(Symbol(2)), "source_file");
    assert_eq!(language.symbol_name(Symbol::ERROR), "ERROR");
    assert_eq!(language.symbol_for_name("source_file", true), Some(Symbol(2)));
    assert_eq!(language.symbol_for_name("a", true), None);
    assert_eq!(language.field_id_for_name("body"), FieldId::new(1));
    assert_eq!(language.actions(StateId(0), Symbol(1)), &[ParseAction::Shift(StateId(1))]);
    assert_eq!(language.goto(StateId(0), Symbol(2)), Some(StateId(2)));
    assert!(language.actions(StateId(0), Symbol::ERROR).is_empty());
    assert_eq!(language.ambiguity_policy(), AmbiguityPolicy::FirstAction);
    assert_eq!(language.data(), &tiny());
    assert_eq!(Language::load(&language.to_bytes()).unwrap(), language);
}

#[test]
fn version_outside_abi_range_is_incompatible() {
    let mut bytes = tiny().encode();
    bytes[4..6].copy_from_slice(&0xFFFFu16.to_le_bytes());

    assert_eq!(
        Language::load(&bytes).unwrap_err(),
        LoadError::IncompatibleVersion { version: 0xFFFF, min: 1, max: 3 }
    );

    bytes[4..6].copy_from_slice(&0u16.to_le_bytes());
    assert!(matches!(
        Language::load(&bytes),
        Err(LoadError::IncompatibleVersion { version: 0, .. })
    ));
}

#[test]
fn decoded_tables_outside_abi_range_are_incompatible() {
    let mut data = tiny();
    data.version = 0xFFFF;
    assert_eq!(
        Language::from_data(data).unwrap_err(),
        LoadError::IncompatibleVersion { version: 0xFFFF, min: 1, max: 3 }
    );

    let mut data = tiny();
    data.version = 1;
    assert_eq!(Language::from_data(data).unwrap().version(), 1);
}

#[test]
fn older_layouts_load_with_defaults() {
    let v1 = Language::load(&tiny().encode_as(1)).unwrap();
    assert_eq!(v1.version(), 1);
    assert_eq!(v1.field_count(), 0);
    assert!(v1.production(ProductionId(0)).fields.is_empty());
    assert_eq!(v1.ambiguity_policy(), AmbiguityPolicy::DynamicPrecedence);

    let v2 = Language::load(&tiny().encode_as(2)).unwrap();
    assert_eq!(v2.field_name(FieldId::new(1).unwrap()), Some("body"));
    assert_eq!(v2.field_name(FieldId::new(7).unwrap()), None);
    assert_eq!(v2.ambiguity_policy(), AmbiguityPolicy::DynamicPrecedence);
    assert_eq!(Language::load(&v2.to_bytes()).unwrap(), v2);
}

#[test]
fn bad_header_and_truncation_are_malformed() {
    assert_eq!(malformed_section(Language::load(b"")), "header");
    assert_eq!(malformed_section(Language::load(b"NOPE\x03\x00")), "header");

    let bytes = tiny().encode();
    for len in [10, bytes.len() / 2, bytes.len() - 1] {
        assert!(matches!(
            Language::load(&bytes[..len]),
            Err(LoadError::MalformedTable { .. })
        ));
    }

    let mut trailing = bytes;
    trailing.push(0);
    assert_eq!(malformed_section(Language::load(&trailing)), "trailer");
}

#[test]
fn out_of_range_references_are_malformed() {
    let mut data = tiny();
    data.parse.action_lists[1] = vec![ParseAction::Shift(StateId(7))];
    assert_eq!(malformed_section(Language::load(&data.encode())), "parse table");

    let mut data = tiny();
    data.parse.action_lists[3] = vec![ParseAction::Reduce(ProductionId(1))];
    assert_eq!(malformed_section(Language::load(&data.encode())), "parse table");

    let mut data = tiny();
    data.parse.cells[1] = 42;
    assert_eq!(malformed_section(Language::load(&data.encode())), "parse table");

    let mut data = tiny();
    data.parse.action_lists[2] = vec![ParseAction::Shift(StateId(2))];
    assert_eq!(malformed_section(Language::load(&data.encode())), "parse table");

    let mut data = tiny();
    data.lex.transitions[1] = 9;
    assert_eq!(malformed_section(Language::load(&data.encode())), "lexer");

    let mut data = tiny();
    data.lex.accept[1] = LexAccept::Token(Symbol(2));
    assert_eq!(malformed_section(Language::load(&data.encode())), "lexer");

    let mut data = tiny();
    data.productions[0].lhs = Symbol(1);
    assert_eq!(malformed_section(Language::load(&data.encode())), "productions");

    let mut data = tiny();
    data.productions[0].fields = vec![(0, FieldId::new(5).unwrap())];
    assert_eq!(malformed_section(Language::load(&data.encode())), "productions");

    let mut data = tiny();
    data.parse.lex_modes[2] = 3;
    assert_eq!(malformed_section(Language::load(&data.encode())), "parse table");
}

#[test]
fn handles_are_shared_across_threads() {
    let language = Language::load(&tiny().encode()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let language = language.clone();
            std::thread::spawn(move || language.symbol_count())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}
