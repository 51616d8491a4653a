//! Constructors for every node kind.
//!
//! Closures passed to the array operations are called exactly
//! once, with fresh [`Exp::Param`] placeholders, and the term
//! they return becomes the function body.

use std::rc::Rc;

use crate::{
    graph::Graph,
    node::{Acc, AccId, Array, Boundary, Exp, ExpId, Fun, Neighbourhood, StencilFun},
    scalar::{PrimFun, Scalar},
};

impl Graph {
    /// Allocates a fresh closure parameter placeholder.
    pub fn param(&mut self) -> ExpId {
        self.insert_exp(Exp::Param)
    }

    /// Materialises a unary closure.
    pub fn fun1<F>(&mut self, f: F) -> Fun
    where
        F: FnOnce(&mut Self, ExpId) -> ExpId,
    {
        let x = self.param();
        let body = f(self, x);
        Fun {
            params: Box::new([x]),
            body,
        }
    }

    /// Materialises a binary closure.
    pub fn fun2<F>(&mut self, f: F) -> Fun
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let x = self.param();
        let y = self.param();
        let body = f(self, x, y);
        Fun {
            params: Box::new([x, y]),
            body,
        }
    }

    /// A scalar constant.
    pub fn constant(&mut self, v: impl Into<Scalar>) -> ExpId {
        self.insert_exp(Exp::Const(v.into()))
    }

    /// A tuple.
    pub fn tuple(&mut self, es: impl Into<Box<[ExpId]>>) -> ExpId {
        self.insert_exp(Exp::Tuple(es.into()))
    }

    /// Projects component `i` out of a tuple.
    pub fn prj(&mut self, i: usize, e: ExpId) -> ExpId {
        self.insert_exp(Exp::Prj(i, e))
    }

    /// A conditional.
    pub fn cond(&mut self, c: ExpId, t: ExpId, e: ExpId) -> ExpId {
        self.insert_exp(Exp::Cond(c, t, e))
    }

    /// Applies a primitive.
    pub fn prim(&mut self, f: PrimFun, args: impl Into<Box<[ExpId]>>) -> ExpId {
        self.insert_exp(Exp::PrimApp(f, args.into()))
    }

    /// `a + b`
    pub fn add(&mut self, a: ExpId, b: ExpId) -> ExpId {
        self.prim(PrimFun::Add, [a, b])
    }

    /// `a * b`
    pub fn mul(&mut self, a: ExpId, b: ExpId) -> ExpId {
        self.prim(PrimFun::Mul, [a, b])
    }

    /// `a - b`
    pub fn sub(&mut self, a: ExpId, b: ExpId) -> ExpId {
        self.prim(PrimFun::Sub, [a, b])
    }

    /// Reads element `ix` of `xs`.
    pub fn index(&mut self, xs: AccId, ix: ExpId) -> ExpId {
        self.insert_exp(Exp::Index(xs, ix))
    }

    /// The shape of `xs`.
    pub fn shape(&mut self, xs: AccId) -> ExpId {
        self.insert_exp(Exp::Shape(xs))
    }

    /// The number of elements of `xs`.
    pub fn size(&mut self, xs: AccId) -> ExpId {
        self.insert_exp(Exp::Size(xs))
    }

    /// Embeds a host array.
    pub fn use_array(&mut self, array: Array) -> AccId {
        self.insert_acc(Acc::Use(Rc::new(array)))
    }

    /// A singleton array.
    pub fn unit(&mut self, e: ExpId) -> AccId {
        self.insert_acc(Acc::Unit(e))
    }

    /// Builds an array from an index function.
    pub fn generate<F>(&mut self, sh: ExpId, f: F) -> AccId
    where
        F: FnOnce(&mut Self, ExpId) -> ExpId,
    {
        let f = self.fun1(f);
        self.insert_acc(Acc::Generate(sh, f))
    }

    /// Changes the shape of `xs`.
    pub fn reshape(&mut self, sh: ExpId, xs: AccId) -> AccId {
        self.insert_acc(Acc::Reshape(sh, xs))
    }

    /// Applies `f` to every element of `xs`.
    pub fn map<F>(&mut self, f: F, xs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId) -> ExpId,
    {
        let f = self.fun1(f);
        self.insert_acc(Acc::Map(f, xs))
    }

    /// Combines `xs` and `ys` element-wise.
    pub fn zip_with<F>(&mut self, f: F, xs: AccId, ys: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::ZipWith(f, xs, ys))
    }

    /// Reduces the innermost dimension of `xs`.
    pub fn fold<F>(&mut self, f: F, z: ExpId, xs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::Fold(f, z, xs))
    }

    /// Reduces the innermost dimension of a non-empty `xs`.
    pub fn fold1<F>(&mut self, f: F, xs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::Fold1(f, xs))
    }

    /// Reduces each segment of `xs` described by `segs`.
    pub fn fold_seg<F>(&mut self, f: F, z: ExpId, xs: AccId, segs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::FoldSeg(f, z, xs, segs))
    }

    /// Left-to-right prescan.
    pub fn scanl<F>(&mut self, f: F, z: ExpId, xs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::Scanl(f, z, xs))
    }

    /// Prescan returning the scan and the total. Read the
    /// results with [`Graph::fst`] and [`Graph::snd`].
    pub fn scanl_total<F>(&mut self, f: F, z: ExpId, xs: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
    {
        let f = self.fun2(f);
        self.insert_acc(Acc::ScanlTotal(f, z, xs))
    }

    /// The first result of a multi-result operation.
    pub fn fst(&mut self, pair: AccId) -> AccId {
        self.insert_acc(Acc::Fst(pair))
    }

    /// The second result of a multi-result operation.
    pub fn snd(&mut self, pair: AccId) -> AccId {
        self.insert_acc(Acc::Snd(pair))
    }

    /// Forward permutation of `src` into `defaults`.
    pub fn permute<F, P>(&mut self, combine: F, defaults: AccId, ix: P, src: AccId) -> AccId
    where
        F: FnOnce(&mut Self, ExpId, ExpId) -> ExpId,
        P: FnOnce(&mut Self, ExpId) -> ExpId,
    {
        let combine = self.fun2(combine);
        let ix = self.fun1(ix);
        self.insert_acc(Acc::Permute(combine, defaults, ix, src))
    }

    /// Backward permutation of `src` into an array of shape `sh`.
    pub fn backpermute<P>(&mut self, sh: ExpId, ix: P, src: AccId) -> AccId
    where
        P: FnOnce(&mut Self, ExpId) -> ExpId,
    {
        let ix = self.fun1(ix);
        self.insert_acc(Acc::Backpermute(sh, ix, src))
    }

    /// Applies `f` to the neighbourhood of every element of
    /// `xs`. `f` receives one placeholder per neighbour,
    /// row-major.
    pub fn stencil<F>(
        &mut self,
        neighbourhood: Neighbourhood,
        f: F,
        boundary: Boundary,
        xs: AccId,
    ) -> AccId
    where
        F: FnOnce(&mut Self, &[ExpId]) -> ExpId,
    {
        let arg = self.param();
        let neighbours = (0..neighbourhood.len())
            .map(|_| self.param())
            .collect::<Box<[_]>>();
        let body = f(self, &neighbours);
        let f = StencilFun {
            neighbourhood,
            arg,
            neighbours,
            body,
        };
        self.insert_acc(Acc::Stencil(f, boundary, xs))
    }
}
