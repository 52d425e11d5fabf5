//! Flatteners that collect nested statements out of module bodies.
//!
//! Both collectors yield in source order (depth-first, left-to-right) and
//! skip the Always/Generate/Initial/Task wrapper nodes, yielding their
//! contained statements directly.

use super::{
    AlwaysStatement, FileNode, InteriorNode, ModuleNode, SystemCallNode, TaskNode, TaskStatement,
    TopLevelStatement,
};

/// Every interior statement reachable through nested block bodies.
pub fn interior_statements(file: &FileNode) -> Vec<&InteriorNode> {
    let mut result = Vec::new();
    for statement in &file.statements {
        if let TopLevelStatement::Module(module) = statement {
            for interior in &module.interior {
                collect_interior(interior, &mut result);
            }
        }
    }
    result
}

/// Interior statements of a single module, flattened the same way.
pub fn module_interior_statements(module: &ModuleNode) -> Vec<&InteriorNode> {
    let mut result = Vec::new();
    for interior in &module.interior {
        collect_interior(interior, &mut result);
    }
    result
}

/// Every system-task call reachable through nested block bodies.
pub fn system_calls(file: &FileNode) -> Vec<&SystemCallNode> {
    let mut result = Vec::new();
    for statement in &file.statements {
        if let TopLevelStatement::Module(module) = statement {
            for interior in &module.interior {
                collect_calls_interior(interior, &mut result);
            }
        }
    }
    result
}

fn collect_interior<'a>(node: &'a InteriorNode, out: &mut Vec<&'a InteriorNode>) {
    match node {
        InteriorNode::Always(always) => collect_stmt(&always.statement, out),
        InteriorNode::Generate(generate) => {
            for stmt in &generate.statements {
                collect_stmt(stmt, out);
            }
        }
        InteriorNode::Initial(initial) => collect_stmt(&initial.statement, out),
        InteriorNode::Task(task) => collect_task(task, out),
        _ => out.push(node),
    }
}

fn collect_stmt<'a>(stmt: &'a AlwaysStatement, out: &mut Vec<&'a InteriorNode>) {
    match stmt {
        AlwaysStatement::Begin(block) => {
            for stmt in &block.statements {
                collect_stmt(stmt, out);
            }
        }
        AlwaysStatement::Case(case) => {
            for arm in &case.cases {
                collect_stmt(&arm.statement, out);
            }
            if let Some(default) = &case.default {
                collect_stmt(default, out);
            }
        }
        AlwaysStatement::For(block) => collect_stmt(&block.body, out),
        AlwaysStatement::If(block) => {
            collect_stmt(&block.body, out);
            if let Some(else_body) = &block.else_body {
                collect_stmt(else_body, out);
            }
        }
        AlwaysStatement::Interior(interior) => collect_interior(interior, out),
        AlwaysStatement::SystemCall(_) | AlwaysStatement::Delay(_) => {}
    }
}

fn collect_task<'a>(task: &'a TaskNode, out: &mut Vec<&'a InteriorNode>) {
    for stmt in &task.statements {
        match stmt {
            TaskStatement::Begin(block) => {
                for stmt in &block.statements {
                    collect_stmt(stmt, out);
                }
            }
            TaskStatement::Interior(interior) => collect_interior(interior, out),
        }
    }
}

fn collect_calls_interior<'a>(node: &'a InteriorNode, out: &mut Vec<&'a SystemCallNode>) {
    match node {
        InteriorNode::Always(always) => collect_calls_stmt(&always.statement, out),
        InteriorNode::Generate(generate) => {
            for stmt in &generate.statements {
                collect_calls_stmt(stmt, out);
            }
        }
        InteriorNode::Initial(initial) => collect_calls_stmt(&initial.statement, out),
        InteriorNode::Task(task) => {
            for stmt in &task.statements {
                match stmt {
                    TaskStatement::Begin(block) => {
                        for stmt in &block.statements {
                            collect_calls_stmt(stmt, out);
                        }
                    }
                    TaskStatement::Interior(interior) => collect_calls_interior(interior, out),
                }
            }
        }
        _ => {}
    }
}

fn collect_calls_stmt<'a>(stmt: &'a AlwaysStatement, out: &mut Vec<&'a SystemCallNode>) {
    match stmt {
        AlwaysStatement::Begin(block) => {
            for stmt in &block.statements {
                collect_calls_stmt(stmt, out);
            }
        }
        AlwaysStatement::Case(case) => {
            for arm in &case.cases {
                collect_calls_stmt(&arm.statement, out);
            }
            if let Some(default) = &case.default {
                collect_calls_stmt(default, out);
            }
        }
        AlwaysStatement::For(block) => collect_calls_stmt(&block.body, out),
        AlwaysStatement::If(block) => {
            collect_calls_stmt(&block.body, out);
            if let Some(else_body) = &block.else_body {
                collect_calls_stmt(else_body, out);
            }
        }
        AlwaysStatement::SystemCall(call) => out.push(call),
        AlwaysStatement::Interior(interior) => collect_calls_interior(interior, out),
        AlwaysStatement::Delay(_) => {}
    }
}
