// stmt.rs — Statement analysis
//
// Statements inside function bodies. Blocks and `for` headers open a child
// scope; conditions must be exactly `bool`; `return` is checked against the
// enclosing function's signature.
//
// Preconditions: `AnalyzeCtx::func` is set (statements only occur in bodies).
// Postconditions: a statement whose expression was rejected yields no node.
// Failure modes: E03xx diagnostics.
// Side effects: none beyond the analysis context.

use crate::analyze::AnalyzeCtx;
use crate::ast::*;
use crate::diag::{codes, DiagCode};
use crate::id::InstrId;
use crate::ir::{InstrKind, JumpKind};
use crate::scope::ScopeKind;

impl AnalyzeCtx<'_, '_> {
    pub(crate) fn stmt(&mut self, s: &Stmt) -> Option<InstrId> {
        if !self.enter(s.span()) {
            return None;
        }
        let id = self.stmt_kind(s);
        self.leave();
        id
    }

    fn stmt_kind(&mut self, s: &Stmt) -> Option<InstrId> {
        match s {
            Stmt::Block(b) => Some(self.block(b)),
            Stmt::Expr { expr, span } => {
                let e = self.expr(expr)?;
                Some(self.push_instr(InstrKind::ExprStmt { expr: e }, None, *span))
            }
            Stmt::Empty { span } => Some(self.push_instr(InstrKind::Empty, None, *span)),
            Stmt::If {
                cond,
                then,
                else_,
                span,
            } => {
                let c = self.condition(cond, codes::E0306);
                let t = self.stmt(then);
                let e = else_.as_deref().map(|e| self.stmt(e));
                let (c, t) = (c?, t?);
                let else_ = match e {
                    Some(None) => return None,
                    Some(Some(id)) => Some(id),
                    None => None,
                };
                Some(self.push_instr(InstrKind::If { cond: c, then: t, else_ }, None, *span))
            }
            Stmt::While { cond, body, span } => {
                let c = self.condition(cond, codes::E0307);
                let b = self.stmt(body);
                let (cond, body) = (c?, b?);
                Some(self.push_instr(InstrKind::While { cond, body }, None, *span))
            }
            Stmt::DoWhile { body, cond, span } => {
                let b = self.stmt(body);
                let c = self.condition(cond, codes::E0308);
                let (body, cond) = (b?, c?);
                Some(self.push_instr(InstrKind::DoWhile { body, cond }, None, *span))
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                span,
            } => self.for_loop(init.as_ref(), cond.as_ref(), step.as_ref(), body, *span),
            Stmt::Return { expr, span } => self.return_stmt(expr.as_ref(), *span),
            Stmt::Break { span } => Some(self.push_instr(InstrKind::Jump(JumpKind::Break), None, *span)),
            Stmt::Continue { span } => Some(self.push_instr(InstrKind::Jump(JumpKind::Continue), None, *span)),
            Stmt::Discard { span } => Some(self.push_instr(InstrKind::Jump(JumpKind::Discard), None, *span)),
            Stmt::Decl { decl, span } => self.local_decl(decl, *span),
        }
    }

    /// `{ ... }` in its own scope. Rejected statements are skipped.
    pub(crate) fn block(&mut self, block: &Block) -> InstrId {
        self.scope.push(ScopeKind::Default);
        let stmts: Vec<InstrId> = block.stmts.iter().filter_map(|s| self.stmt(s)).collect();
        let id = self.push_instr(InstrKind::Block { stmts }, None, block.span);
        self.scope.pop();
        id
    }

    fn condition(&mut self, cond: &Expr, code: DiagCode) -> Option<InstrId> {
        let c = self.expr(cond)?;
        let ty = self.ty_of(c);
        if !ty.is_exactly("bool") || !ty.readable() {
            self.error(code, cond.span(), vec![("found", ty.to_string())]);
            return None;
        }
        Some(c)
    }

    fn for_loop(
        &mut self,
        init: Option<&ForInit>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        span: Span,
    ) -> Option<InstrId> {
        self.scope.push(ScopeKind::Default);
        let init_id = init.map(|i| match i {
            ForInit::Variable(decl) => {
                let decls = self.variable_decl(decl);
                if decls.len() < decl.vars.len() {
                    return None;
                }
                Some(self.push_instr(InstrKind::DeclStmt { decls }, None, decl.span))
            }
            ForInit::Expr { expr } => {
                let e = self.expr(expr)?;
                Some(self.push_instr(InstrKind::ExprStmt { expr: e }, None, expr.span()))
            }
        });
        let cond_id = cond.map(|c| self.condition(c, codes::E0309));
        let step_id = step.map(|s| self.expr(s));
        let body_id = self.stmt(body);
        self.scope.pop();

        // A missing clause is fine; a rejected one drops the loop.
        let init = match init_id {
            Some(None) => return None,
            other => other.flatten(),
        };
        let cond = match cond_id {
            Some(None) => return None,
            other => other.flatten(),
        };
        let step = match step_id {
            Some(None) => return None,
            other => other.flatten(),
        };
        let body = body_id?;
        Some(self.push_instr(InstrKind::For { init, cond, step, body }, None, span))
    }

    fn return_stmt(&mut self, expr: Option<&Expr>, span: Span) -> Option<InstrId> {
        let Some(expected) = self.func.as_mut().map(|f| {
            f.return_seen = true;
            f.sig.return_type.clone()
        }) else {
            return None;
        };
        let Some(expr) = expr else {
            if !expected.is_void() {
                self.error(codes::E0302, span, vec![("expected", expected.to_string())]);
                return None;
            }
            return Some(self.push_instr(InstrKind::Return { expr: None }, None, span));
        };
        let e = self.expr(expr)?;
        let found = self.ty_of(e);
        if expected.is_void() {
            self.error(codes::E0301, span, Vec::new());
            return None;
        }
        if !found.readable() || !found.is_equal(&expected) {
            let info = vec![
                ("expected", expected.to_string()),
                ("found", found.to_string()),
            ];
            self.error(codes::E0303, span, info);
            return None;
        }
        Some(self.push_instr(InstrKind::Return { expr: Some(e) }, None, span))
    }

    fn local_decl(&mut self, decl: &LocalDecl, span: Span) -> Option<InstrId> {
        let decls = match decl {
            LocalDecl::Type(t) => vec![self.struct_def(&t.def)?.1],
            LocalDecl::Typedef(t) => vec![self.typedef(t)?],
            LocalDecl::Variable(v) => self.variable_decl(v),
        };
        if decls.is_empty() {
            return None;
        }
        Some(self.push_instr(InstrKind::DeclStmt { decls }, None, span))
    }
}
