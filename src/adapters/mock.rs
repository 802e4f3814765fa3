//! Mock 会话（用于无真实网关环境的单测/离线演示）。
//!
//! 行为约定（便于在测试里快速构造不同质量结果）：
//! - `fail_resolve(segment)` → 该段 `child` 解析返回 `NotFound`
//! - `fail_read` / `fail_write`（按浏览名）→ 对应操作返回 `Read` / `Write` 错误
//! - `readback_override(browse, v)` → 写入成功但回读返回 v（制造容差失败）
//! - `fail_metadata` / `fail_children`（按节点）→ 元数据/子节点枚举失败
//! - `add_edge` 可以构造回边，用于访问守卫（visited-set）测试
//!
//! 写入通过一个节点句柄落到共享状态，后续任何句柄的回读都能看到。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ports::session::{SessionError, TypedValue, UaNode, UaSession};

#[derive(Debug)]
struct MockNodeData {
    node_id: String,
    browse_name: String,
    display_name: String,
    children: Vec<usize>,
    value: Option<TypedValue>,
}

#[derive(Debug, Default)]
struct MockState {
    nodes: Vec<MockNodeData>,
    fail_resolve: HashSet<String>,
    fail_read: HashSet<String>,
    fail_write: HashSet<String>,
    fail_metadata: HashSet<usize>,
    fail_children: HashSet<usize>,
    readback_override: HashMap<String, f64>,
    disconnects: u32,
}

const ROOT: usize = 0;
const OBJECTS: usize = 1;

#[derive(Clone)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    /// 预置 Root 与其 Objects 子节点（标准地址空间的最小骨架）。
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.nodes.push(MockNodeData {
            node_id: "i=84".to_string(),
            browse_name: "0:Root".to_string(),
            display_name: "Root".to_string(),
            children: vec![OBJECTS],
            value: None,
        });
        state.nodes.push(MockNodeData {
            node_id: "i=85".to_string(),
            browse_name: "0:Objects".to_string(),
            display_name: "Objects".to_string(),
            children: Vec::new(),
            value: None,
        });
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn objects_id(&self) -> usize {
        OBJECTS
    }

    /// 在 parent 下挂一个对象节点，返回内部编号。
    pub fn add_node(&self, parent: usize, browse_name: &str, display_name: &str) -> usize {
        self.push_node(parent, browse_name, display_name, None)
    }

    /// 在 parent 下挂一个带初值的变量节点。
    pub fn add_variable(
        &self,
        parent: usize,
        browse_name: &str,
        display_name: &str,
        value: f64,
    ) -> usize {
        self.push_node(
            parent,
            browse_name,
            display_name,
            Some(TypedValue::float(value)),
        )
    }

    /// 追加一条已有节点间的边（可构造回边/菱形引用）。
    pub fn add_edge(&self, from: usize, to: usize) {
        self.state.lock().nodes[from].children.push(to);
    }

    pub fn fail_resolve(&self, segment: &str) {
        self.state.lock().fail_resolve.insert(segment.to_string());
    }

    pub fn fail_read(&self, browse_name: &str) {
        self.state.lock().fail_read.insert(browse_name.to_string());
    }

    pub fn fail_write(&self, browse_name: &str) {
        self.state.lock().fail_write.insert(browse_name.to_string());
    }

    pub fn fail_metadata(&self, node: usize) {
        self.state.lock().fail_metadata.insert(node);
    }

    pub fn fail_children(&self, node: usize) {
        self.state.lock().fail_children.insert(node);
    }

    pub fn readback_override(&self, browse_name: &str, value: f64) {
        self.state
            .lock()
            .readback_override
            .insert(browse_name.to_string(), value);
    }

    /// 当前存储值（断言写入是否真的落库）。
    pub fn stored_value(&self, node: usize) -> Option<f64> {
        self.state.lock().nodes[node]
            .value
            .as_ref()
            .and_then(TypedValue::as_f64)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.state.lock().disconnects
    }

    fn push_node(
        &self,
        parent: usize,
        browse_name: &str,
        display_name: &str,
        value: Option<TypedValue>,
    ) -> usize {
        let mut state = self.state.lock();
        let idx = state.nodes.len();
        state.nodes.push(MockNodeData {
            node_id: format!("ns=1;i={idx}"),
            browse_name: browse_name.to_string(),
            display_name: display_name.to_string(),
            children: Vec::new(),
            value,
        });
        state.nodes[parent].children.push(idx);
        idx
    }

    fn node(&self, idx: usize) -> MockNode {
        MockNode {
            state: Arc::clone(&self.state),
            idx,
        }
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UaSession for MockSession {
    type Node = MockNode;

    fn root_node(&self) -> Result<MockNode, SessionError> {
        Ok(self.node(ROOT))
    }

    fn objects_node(&self) -> Result<MockNode, SessionError> {
        Ok(self.node(OBJECTS))
    }

    fn disconnect(&self) {
        self.state.lock().disconnects += 1;
    }
}

#[derive(Debug)]
pub struct MockNode {
    state: Arc<Mutex<MockState>>,
    idx: usize,
}

impl UaNode for MockNode {
    fn node_id(&self) -> String {
        self.state.lock().nodes[self.idx].node_id.clone()
    }

    fn browse_name(&self) -> Result<String, SessionError> {
        let state = self.state.lock();
        if state.fail_metadata.contains(&self.idx) {
            return Err(SessionError::Read {
                message: format!("metadata unavailable for {}", state.nodes[self.idx].node_id),
            });
        }
        Ok(state.nodes[self.idx].browse_name.clone())
    }

    fn display_name(&self) -> Result<String, SessionError> {
        let state = self.state.lock();
        if state.fail_metadata.contains(&self.idx) {
            return Err(SessionError::Read {
                message: format!("metadata unavailable for {}", state.nodes[self.idx].node_id),
            });
        }
        Ok(state.nodes[self.idx].display_name.clone())
    }

    fn child(&self, path: &str) -> Result<MockNode, SessionError> {
        let state = self.state.lock();
        let mut current = self.idx;
        for segment in path.split('/') {
            if state.fail_resolve.contains(segment) {
                return Err(SessionError::NotFound {
                    path: segment.to_string(),
                });
            }
            current = state.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&child| state.nodes[child].browse_name == segment)
                .ok_or_else(|| SessionError::NotFound {
                    path: segment.to_string(),
                })?;
        }
        Ok(MockNode {
            state: Arc::clone(&self.state),
            idx: current,
        })
    }

    fn children(&self) -> Result<Vec<MockNode>, SessionError> {
        let state = self.state.lock();
        if state.fail_children.contains(&self.idx) {
            return Err(SessionError::Read {
                message: format!("browse failed for {}", state.nodes[self.idx].node_id),
            });
        }
        Ok(state.nodes[self.idx]
            .children
            .iter()
            .map(|&child| MockNode {
                state: Arc::clone(&self.state),
                idx: child,
            })
            .collect())
    }

    fn read_value(&self) -> Result<TypedValue, SessionError> {
        let state = self.state.lock();
        let data = &state.nodes[self.idx];
        if state.fail_read.contains(&data.browse_name) {
            return Err(SessionError::Read {
                message: format!("read rejected for {}", data.browse_name),
            });
        }
        if let Some(value) = state.readback_override.get(&data.browse_name) {
            return Ok(TypedValue::float(*value));
        }
        data.value.clone().ok_or_else(|| SessionError::Read {
            message: format!("{} has no value attribute", data.browse_name),
        })
    }

    fn write_value(&self, value: TypedValue) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let browse_name = state.nodes[self.idx].browse_name.clone();
        if state.fail_write.contains(&browse_name) {
            return Err(SessionError::Write {
                message: format!("write rejected for {browse_name}"),
            });
        }
        state.nodes[self.idx].value = Some(value);
        Ok(())
    }
}
