#![cfg(test)]
#![allow(clippy::panic)]
#![expect(clippy::unwrap_used)]

use std::{
    fmt,
    hash::Hash,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
};

use buggy::Bug;
use indexmap::IndexMap;
use tessel_ast::{AccId, Array, Boundary, ExpId, Graph, Neighbourhood, PrimFun, Scalar};
use tessel_ir::{Idx, OpenAcc, OpenExp, OpenFun};
use test_log::test;

use crate::{
    Compiler, Layout, LowerError, NestedTuples, Projection, StencilShapes,
    identity::{AccView, ExpView, Identify},
    occurrence::count_occurrences,
    scope::{Annotated, resolve, unfold},
};

/// Runs `f`, which must hit an internal bug with message `msg`.
///
/// Bugs panic in debug builds and are returned in release
/// builds; both are accepted.
fn assert_bug<T: fmt::Debug>(f: impl FnOnce() -> Result<T, Bug>, msg: &str) {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => panic!("expected bug {msg:?}, got {v:?}"),
        Ok(Err(bug)) => assert_eq!(bug.msg(), msg),
        Err(payload) => {
            let text = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or_default();
            assert!(text.contains(msg), "unexpected panic: {text}");
        }
    }
}

fn plain<I, const N: usize>(id: I, children: [(I, Rc<Annotated<I>>); N]) -> Rc<Annotated<I>>
where
    I: Copy + Hash + Eq,
{
    Rc::new(Annotated::Plain {
        id,
        children: IndexMap::from_iter(children),
    })
}

fn var<I: Hash + Eq>(id: I) -> Rc<Annotated<I>> {
    Rc::new(Annotated::Variable(id))
}

fn bind<I: Hash + Eq>(id: I, bound: Rc<Annotated<I>>, body: Rc<Annotated<I>>) -> Rc<Annotated<I>> {
    Rc::new(Annotated::Binding { id, bound, body })
}

fn iota(g: &mut Graph, n: i64) -> AccId {
    g.use_array(Array::vector((0..n).map(Scalar::Int).collect()))
}

fn incr(g: &mut Graph, x: ExpId) -> ExpId {
    let one = g.constant(1i64);
    g.add(x, one)
}

fn add(a: OpenExp, b: OpenExp) -> OpenExp {
    OpenExp::PrimApp(PrimFun::Add, vec![a, b])
}

fn mul(a: OpenExp, b: OpenExp) -> OpenExp {
    OpenExp::PrimApp(PrimFun::Mul, vec![a, b])
}

fn v(i: usize) -> OpenExp {
    OpenExp::Var(Idx(i))
}

fn avar(i: usize) -> Box<OpenAcc> {
    Box::new(OpenAcc::Avar(Idx(i)))
}

fn sum() -> OpenFun {
    OpenFun::new(2, add(v(1), v(0)))
}

/// `zip_with(+, map(f1, m), map(f2, m))` where
/// `m = map(+1, xs)`.
struct Diamond {
    g: Graph,
    xs: AccId,
    m: AccId,
    a: AccId,
    b: AccId,
    root: AccId,
}

fn diamond() -> Diamond {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let m = g.map(incr, xs);
    let a = g.map(|g, x| g.mul(x, x), m);
    let b = g.map(|g, x| g.sub(x, x), m);
    let root = g.zip_with(|g, x, y| g.add(x, y), a, b);
    Diamond {
        g,
        xs,
        m,
        a,
        b,
        root,
    }
}

#[test]
fn test_identity_is_by_allocation() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 2);
    let ys = iota(&mut g, 2);
    let view = AccView::new(&g, true);
    assert_eq!(g[xs], g[ys]);
    assert!(!view.equal(xs, ys));
    assert!(view.equal(xs, view.identify(xs).unwrap()));
}

#[test]
fn test_children_include_scalar_references() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let ys = iota(&mut g, 4);
    let sh = g.shape(ys);
    let gen_ys = g.generate(sh, |g, ix| {
        let a = g.index(ys, ix);
        let b = g.index(xs, ix);
        g.add(a, b)
    });
    let view = AccView::new(&g, true);
    assert_eq!(view.children(gen_ys).unwrap(), vec![ys, ys, xs]);

    let m = g.map(|g, x| g.mul(x, x), xs);
    let view = AccView::new(&g, true);
    assert_eq!(view.children(m).unwrap(), vec![xs]);
}

#[test]
fn test_count_occurrences() {
    let d = diamond();
    let occ = count_occurrences(&AccView::new(&d.g, true), d.root).unwrap();
    assert_eq!(occ.count(d.root).unwrap(), 1);
    assert_eq!(occ.count(d.a).unwrap(), 1);
    assert_eq!(occ.count(d.b).unwrap(), 1);
    assert_eq!(occ.count(d.m).unwrap(), 2);
    assert_eq!(occ.count(d.xs).unwrap(), 2);
    assert_eq!(occ.len(), 5);
    assert_eq!(occ.shared(), 2);
}

#[test]
fn test_count_occurrences_multiplies_through_shared_ancestors() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let n = g.map(incr, xs);
    let b = g.zip_with(|g, x, y| g.add(x, y), n, n);
    let a = g.zip_with(|g, x, y| g.add(x, y), b, b);
    let root = g.zip_with(|g, x, y| g.add(x, y), a, a);

    let occ = count_occurrences(&AccView::new(&g, true), root).unwrap();
    assert_eq!(
        occ.iter().collect::<Vec<_>>(),
        vec![(root, 1), (a, 2), (b, 4), (n, 8), (xs, 8)]
    );
}

#[test]
fn test_trivial_nodes_are_not_counted() {
    let mut g = Graph::new();
    let x = g.param();
    let one = g.constant(1i64);
    let s = g.mul(x, one);
    let root = g.add(s, s);

    let occ = count_occurrences(&ExpView::new(&g, true), root).unwrap();
    assert_eq!(occ.get(x), None);
    assert_eq!(occ.get(one), None);
    assert_eq!(occ.get(s), Some(2));

    let occ = count_occurrences(&ExpView::new(&g, false), root).unwrap();
    assert!(occ.is_empty());
}

#[test]
fn test_resolve_diamond() {
    let d = diamond();
    let got = Compiler::new(&d.g).annotate(d.root).unwrap();
    let want = bind(
        d.m,
        plain(d.m, [(d.xs, plain(d.xs, []))]),
        plain(
            d.root,
            [
                (d.a, plain(d.a, [(d.m, var(d.m))])),
                (d.b, plain(d.b, [(d.m, var(d.m))])),
            ],
        ),
    );
    assert_eq!(got, want);
}

#[test]
fn test_resolve_without_sharing() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let ys = g.map(incr, xs);
    let z = g.constant(0i64);
    let root = g.fold(|g, a, b| g.add(a, b), z, ys);

    let got = Compiler::new(&g).annotate(root).unwrap();
    let want = plain(root, [(ys, plain(ys, [(xs, plain(xs, []))]))]);
    assert_eq!(got, want);

    let lowered = Compiler::new(&g).lower(root).unwrap();
    assert!(matches!(lowered, OpenAcc::Fold(_, OpenExp::Const(_), _)));
}

#[test]
fn test_resolve_nested_shared_ancestors() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let n = g.map(incr, xs);
    let b = g.zip_with(|g, x, y| g.add(x, y), n, n);
    let a = g.zip_with(|g, x, y| g.add(x, y), b, b);
    let root = g.zip_with(|g, x, y| g.add(x, y), a, a);

    let got = Compiler::new(&g).annotate(root).unwrap();
    let want = bind(
        a,
        bind(
            b,
            bind(
                n,
                plain(n, [(xs, plain(xs, []))]),
                plain(b, [(n, var(n))]),
            ),
            plain(a, [(b, var(b))]),
        ),
        plain(root, [(a, var(a))]),
    );
    assert_eq!(got, want);
}

#[test]
fn test_resolve_disabled() {
    let d = diamond();
    let compiler = Compiler::new(&d.g).recover_acc_sharing(false);
    let got = compiler.annotate(d.root).unwrap();
    let m = plain(d.m, [(d.xs, plain(d.xs, []))]);
    let want = plain(
        d.root,
        [
            (d.a, plain(d.a, [(d.m, Rc::clone(&m))])),
            (d.b, plain(d.b, [(d.m, m)])),
        ],
    );
    assert_eq!(got, want);
}

#[test]
fn test_expand_reproduces_unfolding() {
    let d = diamond();
    let view = AccView::new(&d.g, true);
    let annotated = resolve(&view, d.root).unwrap();
    assert_eq!(
        annotated.expand(&view).unwrap(),
        unfold(&view, d.root).unwrap()
    );
}

#[test]
fn test_unused_binding_is_dropped() {
    // `xs` is shared, but only ever through `m`, so binding `m`
    // is enough.
    let d = diamond();
    let annotated = Compiler::new(&d.g).annotate(d.root).unwrap();
    let Annotated::Binding { id, bound, .. } = annotated.as_ref() else {
        panic!("expected a binding, got {annotated:?}");
    };
    assert_eq!(*id, d.m);
    assert!(matches!(bound.as_ref(), Annotated::Plain { .. }));
}

#[test]
fn test_scalar_sharing() {
    let mut g = Graph::new();
    let x = g.param();
    let s = g.mul(x, x);
    let root = g.add(s, s);

    let got = resolve(&ExpView::new(&g, true), root).unwrap();
    let want = bind(
        s,
        plain(s, [(x, plain(x, []))]),
        plain(root, [(s, var(s))]),
    );
    assert_eq!(got, want);
}

#[test]
fn test_lower_diamond() {
    let d = diamond();
    let got = Compiler::new(&d.g).lower(d.root).unwrap();
    let want = OpenAcc::Alet(
        Box::new(OpenAcc::Map(
            OpenFun::new(1, add(v(0), OpenExp::Const(Scalar::Int(1)))),
            Box::new(OpenAcc::Use(Rc::new(Array::vector(
                (0..4).map(Scalar::Int).collect(),
            )))),
        )),
        Box::new(OpenAcc::ZipWith(
            sum(),
            Box::new(OpenAcc::Map(OpenFun::new(1, mul(v(0), v(0))), avar(0))),
            Box::new(OpenAcc::Map(
                OpenFun::new(
                    1,
                    OpenExp::PrimApp(PrimFun::Sub, vec![v(0), v(0)]),
                ),
                avar(0),
            )),
        )),
    );
    assert_eq!(got, want);
}

#[test]
fn test_lower_scalar_let() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let ys = g.map(
        |g, x| {
            let s = g.mul(x, x);
            g.add(s, s)
        },
        xs,
    );

    let got = Compiler::new(&g).lower(ys).unwrap();
    let OpenAcc::Map(f, _) = &got else {
        panic!("expected map, got {got:?}");
    };
    assert_eq!(
        *f,
        OpenFun::new(
            1,
            OpenExp::Let(Box::new(mul(v(0), v(0))), Box::new(add(v(0), v(0))))
        )
    );

    let got = Compiler::new(&g)
        .recover_exp_sharing(false)
        .lower(ys)
        .unwrap();
    let OpenAcc::Map(f, _) = &got else {
        panic!("expected map, got {got:?}");
    };
    assert_eq!(
        *f,
        OpenFun::new(1, add(mul(v(0), v(0)), mul(v(0), v(0))))
    );
}

#[test]
fn test_lower_binary_parameter_order() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let ys = g.zip_with(|g, x, y| g.sub(x, y), xs, xs);
    let got = Compiler::new(&g).lower(ys).unwrap();
    let OpenAcc::Alet(_, body) = &got else {
        panic!("expected a binding, got {got:?}");
    };
    assert_eq!(
        **body,
        OpenAcc::ZipWith(
            OpenFun::new(2, OpenExp::PrimApp(PrimFun::Sub, vec![v(1), v(0)])),
            avar(0),
            avar(0),
        )
    );
}

#[test]
fn test_lower_multi_result() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 4);
    let z = g.constant(0i64);
    let r = g.scanl_total(|g, a, b| g.add(a, b), z, xs);
    let fst = g.fst(r);
    let snd = g.snd(r);
    let root = g.zip_with(|g, a, b| g.add(a, b), fst, snd);

    let got = Compiler::new(&g).lower(root).unwrap();
    let OpenAcc::Alet(bound, body) = &got else {
        panic!("expected a binding, got {got:?}");
    };
    assert!(matches!(
        bound.as_ref(),
        OpenAcc::ScanlTotal(_, OpenExp::Const(Scalar::Int(0)), _)
    ));
    assert_eq!(
        **body,
        OpenAcc::ZipWith(
            sum(),
            Box::new(OpenAcc::Fst(avar(0))),
            Box::new(OpenAcc::Snd(avar(0))),
        )
    );
}

#[test]
fn test_lower_array_reference_from_scalar_code() {
    let mut g = Graph::new();
    let ys = iota(&mut g, 4);
    let m = g.map(incr, ys);
    let sh = g.shape(ys);
    let gen_ys = g.generate(sh, |g, ix| g.index(ys, ix));
    let root = g.zip_with(|g, a, b| g.add(a, b), m, gen_ys);

    let got = Compiler::new(&g).lower(root).unwrap();
    let OpenAcc::Alet(bound, body) = &got else {
        panic!("expected a binding, got {got:?}");
    };
    assert!(matches!(bound.as_ref(), OpenAcc::Use(_)));
    let OpenAcc::ZipWith(_, left, right) = body.as_ref() else {
        panic!("expected zip_with, got {body:?}");
    };
    assert!(matches!(left.as_ref(), OpenAcc::Map(_, xs) if **xs == OpenAcc::Avar(Idx(0))));
    assert_eq!(
        **right,
        OpenAcc::Generate(
            OpenExp::Shape(avar(0)),
            OpenFun::new(1, OpenExp::Index(avar(0), Box::new(v(0)))),
        )
    );
}

#[test]
fn test_lower_stencil() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 8);
    let nb = Neighbourhood::new([3]).unwrap();
    let st = g.stencil(
        nb,
        |g, ns| {
            let t = g.add(ns[1], ns[2]);
            g.add(ns[0], t)
        },
        Boundary::Clamp,
        xs,
    );

    let got = Compiler::new(&g).lower(st).unwrap();
    let OpenAcc::Stencil(f, Boundary::Clamp, _) = &got else {
        panic!("expected stencil, got {got:?}");
    };
    let prj = |i| OpenExp::Prj(i, Box::new(v(0)));
    assert_eq!(*f, OpenFun::new(1, add(prj(0), add(prj(1), prj(2)))));
}

#[test]
fn test_lower_stencil_2d() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 9);
    let nb = Neighbourhood::new([3, 3]).unwrap();
    let st = g.stencil(nb, |_, ns| ns[5], Boundary::Wrap, xs);

    let got = Compiler::new(&g).lower(st).unwrap();
    let OpenAcc::Stencil(f, ..) = &got else {
        panic!("expected stencil, got {got:?}");
    };
    // Row 1, column 2.
    assert_eq!(
        *f,
        OpenFun::new(
            1,
            OpenExp::Prj(2, Box::new(OpenExp::Prj(1, Box::new(v(0)))))
        )
    );
}

struct Short;

impl StencilShapes for Short {
    fn projections(&self, _rank: usize, _neighbourhood: &Neighbourhood) -> Vec<Projection> {
        vec![vec![0]]
    }
}

#[test]
fn test_lower_stencil_resolver_mismatch() {
    let mut g = Graph::new();
    let xs = iota(&mut g, 8);
    let nb = Neighbourhood::new([3]).unwrap();
    let st = g.stencil(nb, |_, ns| ns[0], Boundary::Mirror, xs);

    let err = Compiler::new(&g).stencils(&Short).lower(st).unwrap_err();
    assert_eq!(
        err,
        LowerError::StencilShape {
            expected: 3,
            got: 1
        }
    );
}

#[test]
fn test_nested_tuples() {
    let nb = Neighbourhood::new([3, 5]).unwrap();
    let paths = NestedTuples.projections(2, &nb);
    assert_eq!(paths.len(), 15);
    assert_eq!(paths[0], vec![0, 0]);
    assert_eq!(paths[4], vec![0, 4]);
    assert_eq!(paths[5], vec![1, 0]);
    assert_eq!(paths[14], vec![2, 4]);
}

#[test]
fn test_layout() {
    let mut g = Graph::new();
    let a = iota(&mut g, 1);
    let b = iota(&mut g, 1);
    let c = iota(&mut g, 1);

    let outer = Layout::new().push(a).push(b);
    let inner = outer.push(c);
    assert_eq!(outer.depth(), 2);
    assert_eq!(inner.depth(), 3);
    assert_eq!(outer.lookup(a).unwrap(), Idx(1));
    assert_eq!(inner.lookup(a).unwrap(), Idx(2));
    assert_eq!(inner.lookup(c).unwrap(), Idx(0));
    assert_eq!(outer.index_of(c), None);
    assert_eq!(inner.get(Idx(1)), Some(b));
    assert_eq!(inner.iter().copied().collect::<Vec<_>>(), vec![c, b, a]);
    assert_eq!(inner.to_string(), format!("[{c}, {b}, {a}]"));
}

#[test]
fn test_layout_lookup_missing() {
    let mut g = Graph::new();
    let a = iota(&mut g, 1);
    let b = iota(&mut g, 1);
    let layout = Layout::new().push(a);
    assert_bug(|| layout.lookup(b), "variable must be bound in the layout");
}

#[test]
fn test_foreign_key() {
    let mut other = Graph::new();
    let _ = iota(&mut other, 1);
    let foreign = iota(&mut other, 1);

    let mut g = Graph::new();
    let _ = iota(&mut g, 1);
    assert_bug(
        || count_occurrences(&AccView::new(&g, true), foreign),
        "array node must belong to the graph",
    );
}

#[test]
fn test_uncounted_identity() {
    let d = diamond();
    let occ = count_occurrences(&AccView::new(&d.g, true), d.a).unwrap();
    assert_bug(|| occ.count(d.b), "identity must have been counted");
}

#[test]
fn test_debug_check_accepts_lowered_program() {
    let d = diamond();
    let lowered = Compiler::new(&d.g).debug(true).lower(d.root).unwrap();
    tessel_ir::check_scopes(&lowered).unwrap();
}
