use refselect::header::{Header, TreeHeader};
use refselect::selector::{
    BracketNode, Child, ClosestTimeNode, MatchNode, NearestNode, SelectVersionNode, Selector,
    SelectorImpl, UseAfterNode,
};
use refselect::Choice;
use std::rc::Rc;
use test_log::test;

fn header(pairs: &[(&str, &str)]) -> Header {
    let mut h = Header::default();
    for (k, v) in pairs {
        h.insert((*k).to_string(), (*v).to_string());
    }
    h
}

/// spec.md §8 scenario 1, carried over from `original_source/lib/selectors.py`'s
/// module doctest almost verbatim.
#[test]
fn scenario_1_nearest_over_select_version() -> refselect::Result<()> {
    let sw = |less_than_5: &str, default: &str| -> Child {
        Child::Node(Box::new(SelectorImpl::SelectVersion(SelectVersionNode::new(
            "sw_version".to_string(),
            vec![
                ("<5".to_string(), Child::Terminal(less_than_5.to_string())),
                ("default".to_string(), Child::Terminal(default.to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )?)))
    };

    let root = NearestNode::new(
        "effective_wavelength".to_string(),
        vec![
            ("1.2".to_string(), sw("cref_flatfield_73.fits", "cref_flatfield_123.fits")),
            ("1.5".to_string(), sw("cref_flatfield_74.fits", "cref_flatfield_124.fits")),
            ("5.0".to_string(), sw("cref_flatfield_87.fits", "cref_flatfield_137.fits")),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let h = header(&[("effective_wavelength", "1.4"), ("sw_version", "6.0")]);
    assert_eq!(root.choose(&h)?.into_single()?, "cref_flatfield_124.fits");
    Ok(())
}

/// Three-level nesting (`GeometricallyNearest` -> `ClosestTime` ->
/// `SelectVersion`), taken from the original module docstring's second
/// doctest. Not otherwise covered end-to-end by spec.md's scenario list.
#[test]
fn three_level_nesting() -> refselect::Result<()> {
    let sw = |less_than_5: &str, default: &str| -> Child {
        Child::Node(Box::new(SelectorImpl::SelectVersion(SelectVersionNode::new(
            "sw_version".to_string(),
            vec![
                ("<5".to_string(), Child::Terminal(less_than_5.to_string())),
                ("default".to_string(), Child::Terminal(default.to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )?)))
    };

    let wave_1_2 = ClosestTimeNode::new(
        "time".to_string(),
        vec![
            ("2017-04-24 00:00:00".to_string(), sw("cref_flatfield_73.fits", "cref_flatfield_123.fits")),
            ("2018-02-01 00:00:00".to_string(), sw("cref_flatfield_223.fits", "cref_flatfield_222.fits")),
            ("2019-04-15 00:00:00".to_string(), sw("cref_flatfield_518.fits", "cref_flatfield_517.fits")),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let wave_1_5 = ClosestTimeNode::new(
        "time".to_string(),
        vec![
            ("2017-04-24 00:00:00".to_string(), sw("cref_flatfield_74.fits", "cref_flatfield_124.fits")),
            ("2019-01-01 00:00:00".to_string(), sw("cref_flatfield_490.fits", "cref_flatfield_489.fits")),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let root = NearestNode::new(
        "effective_wavelength".to_string(),
        vec![
            ("1.2".to_string(), Child::Node(Box::new(SelectorImpl::ClosestTime(wave_1_2)))),
            ("1.5".to_string(), Child::Node(Box::new(SelectorImpl::ClosestTime(wave_1_5)))),
            ("5.0".to_string(), sw("cref_flatfield_87.fits", "cref_flatfield_137.fits")),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let h = header(&[
        ("effective_wavelength", "1.6"),
        ("time", "2019-01-02 00:00:00"),
        ("sw_version", "1.4"),
    ]);
    assert_eq!(root.choose(&h)?.into_single()?, "cref_flatfield_490.fits");
    Ok(())
}

/// spec.md §8 scenario 2.
#[test]
fn scenario_2_use_after() -> refselect::Result<()> {
    let node = UseAfterNode::new(
        vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
        vec![
            ("2003-09-26 01:00:00".to_string(), Child::Terminal("o9s16388j_bia.fits".to_string())),
            ("2004-07-02 08:09:00".to_string(), Child::Terminal("o9t1525sj_bia.fits".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let hit = header(&[("DATE-OBS", "2004-07-02"), ("TIME-OBS", "08:08:59")]);
    assert_eq!(node.choose(&hit)?.into_single()?, "o9s16388j_bia.fits");

    let miss = header(&[("DATE-OBS", "2000-07-02"), ("TIME-OBS", "08:08:59")]);
    assert!(matches!(node.choose(&miss), Err(refselect::Error::NoUseAfter)));
    Ok(())
}

/// spec.md §8 scenario 3: an N/A row loses to an exact two-field match
/// despite winning on field count.
#[test]
fn scenario_3_weighted_match() -> refselect::Result<()> {
    let node = MatchNode::new(
        vec!["foo".to_string(), "bar".to_string()],
        vec![
            (vec!["1.0".to_string(), "N/A".to_string()], Child::Terminal("100".to_string())),
            (vec!["1.0".to_string(), "2.0".to_string()], Child::Terminal("200".to_string())),
            (vec!["4.0".to_string(), "*".to_string()], Child::Terminal("300".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let h = header(&[("foo", "1.0"), ("bar", "2.0")]);
    assert_eq!(node.choose(&h)?.into_single()?, "200");
    Ok(())
}

/// spec.md §8 scenario 4.
#[test]
fn scenario_4_bracket() -> refselect::Result<()> {
    let node = BracketNode::new(
        "effective_wavelength".to_string(),
        vec![
            ("1.2".to_string(), Child::Terminal("A".to_string())),
            ("1.5".to_string(), Child::Terminal("B".to_string())),
            ("5.0".to_string(), Child::Terminal("C".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let lookup = |v: &str| node.choose(&header(&[("effective_wavelength", v)])).unwrap();
    assert_eq!(lookup("1.25"), Choice::Pair("A".to_string(), "B".to_string()));
    assert_eq!(lookup("1.2"), Choice::Pair("A".to_string(), "A".to_string()));
    assert_eq!(lookup("6.0"), Choice::Pair("C".to_string(), "C".to_string()));
    Ok(())
}

/// spec.md §8 scenario 5.
#[test]
fn scenario_5_select_version() -> refselect::Result<()> {
    let node = SelectVersionNode::new(
        "sw_version".to_string(),
        vec![
            ("<3.1".to_string(), Child::Terminal("X".to_string())),
            ("<5".to_string(), Child::Terminal("Y".to_string())),
            ("default".to_string(), Child::Terminal("Z".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let lookup = |v: &str| node.choose(&header(&[("sw_version", v)])).unwrap();
    assert_eq!(lookup("2.0"), Choice::One("X".to_string()));
    assert_eq!(lookup("4.5"), Choice::One("Y".to_string()));
    assert_eq!(lookup("5"), Choice::One("Z".to_string()));
    Ok(())
}

/// spec.md §8 scenario 6: two equal-weight Match survivors whose children
/// are UseAfter selectors must dynamically merge (keeping the
/// lexicographically greater collision child) before the final `choose`.
#[test]
fn scenario_6_match_merges_equal_weight_use_after_children() -> refselect::Result<()> {
    let left = UseAfterNode::new(
        vec!["DATE-OBS".to_string()],
        vec![
            ("2000-01-01".to_string(), Child::Terminal("aaa.fits".to_string())),
            ("2004-07-02".to_string(), Child::Terminal("shared_aaa.fits".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;
    let right = UseAfterNode::new(
        vec!["DATE-OBS".to_string()],
        vec![("2004-07-02".to_string(), Child::Terminal("shared_zzz.fits".to_string()))],
        Rc::new(TreeHeader::default()),
    )?;

    // Two Match selections that are both N/A on `bar`, so they tie on
    // weight for any `foo` value that matches the glob on either side, and
    // their children (UseAfter) are mergeable.
    let node = MatchNode::new(
        vec!["foo".to_string(), "bar".to_string()],
        vec![
            (
                vec!["A|B".to_string(), "N/A".to_string()],
                Child::Node(Box::new(SelectorImpl::UseAfter(left.clone()))),
            ),
            (
                vec!["A|B".to_string(), "N/A".to_string()],
                Child::Node(Box::new(SelectorImpl::UseAfter(right.clone()))),
            ),
        ],
        Rc::new(TreeHeader::default()),
    )?;

    let h = header(&[("foo", "A"), ("DATE-OBS", "2004-07-03")]);
    let via_dynamic_merge = node.choose(&h)?.into_single()?;

    let merged = SelectorImpl::UseAfter(left).merge_with(&SelectorImpl::UseAfter(right))?;
    let via_offline_merge = merged.choose(&h)?.into_single()?;

    assert_eq!(via_dynamic_merge, via_offline_merge);
    assert_eq!(via_dynamic_merge, "shared_zzz.fits");
    Ok(())
}

/// `modify` creates missing intermediate layers per the tree's class list,
/// and a subsequent `choose` reaches the newly inserted value (spec.md §8
/// invariant: "`modify(h, v)` followed by `choose(h)` returns `v`").
#[test]
fn modify_creates_missing_branch_and_is_then_reachable() -> refselect::Result<()> {
    let tree_header = Rc::new(TreeHeader {
        parkey: vec![vec!["FILTER".to_string()]],
        classes: Some(vec!["Match".to_string()]),
        substitutions: None,
        observatory: None,
    });

    let mut root = SelectorImpl::Match(MatchNode::new(
        vec!["FILTER".to_string()],
        vec![(vec!["F140W".to_string()], Child::Terminal("old.fits".to_string()))],
        tree_header,
    )?);

    let legal = refselect::LegalValues::default();
    let h = header(&[("FILTER", "F160W")]);
    root.modify(&h, "new.fits".to_string(), &legal)?;

    assert_eq!(root.choose(&h)?.into_single()?, "new.fits");
    assert_eq!(
        root.choose(&header(&[("FILTER", "F140W")]))?.into_single()?,
        "old.fits"
    );
    Ok(())
}

/// `difference` against an identical tree is empty, and `reference_names`
/// sees every terminal inserted by `modify`.
#[test]
fn difference_self_is_empty_and_reference_names_is_complete() -> refselect::Result<()> {
    let node = SelectVersionNode::new(
        "sw_version".to_string(),
        vec![
            ("<5".to_string(), Child::Terminal("X".to_string())),
            ("default".to_string(), Child::Terminal("Y".to_string())),
        ],
        Rc::new(TreeHeader::default()),
    )?;
    let tree = SelectorImpl::SelectVersion(node);
    assert!(tree.difference(&tree).is_empty());
    assert_eq!(tree.reference_names(), vec!["X".to_string(), "Y".to_string()]);
    Ok(())
}
