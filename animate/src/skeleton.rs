use {
    crate::{error::Error, math::Vec3},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        convert::TryFrom,
        fmt::{self, Display, Formatter},
    },
};

/// Joint addressed either by its position in the skeleton or by its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointRef<'a> {
    Index(usize),
    Label(&'a str),
}

impl From<usize> for JointRef<'_> {
    fn from(index: usize) -> Self {
        JointRef::Index(index)
    }
}

impl<'a> From<&'a str> for JointRef<'a> {
    fn from(label: &'a str) -> Self {
        JointRef::Label(label)
    }
}

impl<'a> From<&'a String> for JointRef<'a> {
    fn from(label: &'a String) -> Self {
        JointRef::Label(label)
    }
}

impl Display for JointRef<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JointRef::Index(index) => write!(fmt, "#{}", index),
            JointRef::Label(label) => write!(fmt, "`{}`", label),
        }
    }
}

/// Named node of the joint hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointNode {
    label: String,

    /// Fixed translation relative to the parent frame.
    offset: Vec3,

    parent: Option<usize>,

    #[serde(skip)]
    children: Vec<usize>,
}

impl JointNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn offset(&self) -> &Vec3 {
        &self.offset
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Child indices in the order they were added.
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// Tree-like structure of joints.
///
/// Joints are stored in a flat array. Index 0 is always the root and every
/// joint's parent has a smaller index, so iterating indices in ascending
/// order visits ancestors before descendants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<JointNode>", into = "Vec<JointNode>")]
pub struct Skeleton {
    joints: Vec<JointNode>,
    by_label: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new(root_label: impl Into<String>, root_offset: Vec3) -> Self {
        let label = root_label.into();
        let mut by_label = HashMap::new();
        by_label.insert(label.clone(), 0);

        Skeleton {
            joints: vec![JointNode {
                label,
                offset: root_offset,
                parent: None,
                children: Vec::new(),
            }],
            by_label,
        }
    }

    /// Appends a joint under `parent` and returns its index.
    pub fn add_joint(
        &mut self,
        label: impl Into<String>,
        offset: Vec3,
        parent: usize,
    ) -> Result<usize, Error> {
        let parent = self.resolve(parent)?;
        let label = label.into();

        if self.by_label.contains_key(&label) {
            return Err(Error::DuplicateLabel { label });
        }

        let index = self.joints.len();
        self.by_label.insert(label.clone(), index);
        self.joints[parent].children.push(index);
        self.joints.push(JointNode {
            label,
            offset,
            parent: Some(parent),
            children: Vec::new(),
        });

        Ok(index)
    }

    /// Removes the joint together with its whole subtree.
    ///
    /// Remaining joints keep their relative order but are re-indexed.
    /// Returns the number of removed joints.
    pub fn remove_joint<'a>(
        &mut self,
        joint: impl Into<JointRef<'a>>,
    ) -> Result<usize, Error> {
        let index = self.resolve(joint)?;
        if index == 0 {
            return Err(Error::InvalidOperation {
                reason: "root joint cannot be removed",
            });
        }

        let mut removed = vec![false; self.joints.len()];
        for descendant in self.descendants(index) {
            removed[descendant] = true;
        }

        let mut remap = vec![None; self.joints.len()];
        let mut next = 0;
        for (old, &gone) in removed.iter().enumerate() {
            if !gone {
                remap[old] = Some(next);
                next += 1;
            }
        }

        let old_joints = std::mem::take(&mut self.joints);
        let removed_count = old_joints.len() - next;

        self.joints = old_joints
            .into_iter()
            .zip(removed)
            .filter(|(_, gone)| !gone)
            .map(|(mut joint, _)| {
                joint.parent = joint.parent.and_then(|p| remap[p]);
                joint.children.retain(|&c| remap[c].is_some());
                for child in &mut joint.children {
                    *child = remap[*child].unwrap_or(*child);
                }
                joint
            })
            .collect();

        self.rebuild_labels();
        tracing::debug!(
            "Removed {} joints, {} left",
            removed_count,
            self.joints.len()
        );
        Ok(removed_count)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[JointNode] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&JointNode> {
        self.joints.get(index)
    }

    /// Resolves a label or index into a valid joint index.
    pub fn resolve<'a>(
        &self,
        joint: impl Into<JointRef<'a>>,
    ) -> Result<usize, Error> {
        match joint.into() {
            JointRef::Index(index) if index < self.joints.len() => Ok(index),
            JointRef::Label(label) => self.index_by_label(label),
            joint => Err(Error::NotFound {
                joint: joint.to_string(),
            }),
        }
    }

    pub fn index_by_label(&self, label: &str) -> Result<usize, Error> {
        self.by_label
            .get(label)
            .copied()
            .ok_or_else(|| Error::NotFound {
                joint: format!("`{}`", label),
            })
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn label(&self, index: usize) -> &str {
        &self.joints[index].label
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn offset(&self, index: usize) -> &Vec3 {
        &self.joints[index].offset
    }

    /// Parent index, `None` only for the root.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.joints[index].parent
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn children(&self, index: usize) -> &[usize] {
        &self.joints[index].children
    }

    /// Pre-order traversal of the subtree rooted at `index`, including `index`.
    /// Children are visited in the order they were added.
    pub fn descendants(&self, index: usize) -> Descendants<'_> {
        Descendants {
            skeleton: self,
            stack: vec![index],
        }
    }

    pub fn descendant_indices(&self, index: usize) -> Vec<usize> {
        self.descendants(index).collect()
    }

    /// Indices from the root down to `index`, inclusive.
    pub fn ancestor_indices(&self, index: usize) -> Vec<usize> {
        let mut chain = vec![index];
        let mut current = index;
        while let Some(parent) = self.joints[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Number of ancestors of the joint. Root has depth 0.
    pub fn depth(&self, index: usize) -> usize {
        self.ancestor_indices(index).len() - 1
    }

    fn rebuild_labels(&mut self) {
        self.by_label = self
            .joints
            .iter()
            .enumerate()
            .map(|(index, joint)| (joint.label.clone(), index))
            .collect();
    }
}

pub struct Descendants<'a> {
    skeleton: &'a Skeleton,
    stack: Vec<usize>,
}

impl Iterator for Descendants<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.stack.pop()?;
        self.stack
            .extend(self.skeleton.joints[index].children.iter().rev());
        Some(index)
    }
}

impl Display for Skeleton {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        for index in self.descendants(0) {
            let depth = self.depth(index);
            writeln!(fmt, "{:indent$}{}", "", self.label(index), indent = depth * 2)?;
        }
        Ok(())
    }
}

impl From<Skeleton> for Vec<JointNode> {
    fn from(skeleton: Skeleton) -> Self {
        skeleton.joints
    }
}

impl TryFrom<Vec<JointNode>> for Skeleton {
    type Error = Error;

    fn try_from(mut joints: Vec<JointNode>) -> Result<Self, Error> {
        match joints.first() {
            None => {
                return Err(Error::InvalidOperation {
                    reason: "skeleton must have a root joint",
                })
            }
            Some(root) if root.parent.is_some() => {
                return Err(Error::InvalidOperation {
                    reason: "joint 0 must be the root",
                })
            }
            Some(_) => {}
        }

        for joint in &mut joints {
            joint.children.clear();
        }

        let mut by_label = HashMap::with_capacity(joints.len());
        for index in 0..joints.len() {
            let label = joints[index].label.clone();
            if by_label.insert(label.clone(), index).is_some() {
                return Err(Error::DuplicateLabel { label });
            }

            if index == 0 {
                continue;
            }

            match joints[index].parent {
                Some(parent) if parent < index => {
                    joints[parent].children.push(index)
                }
                _ => {
                    return Err(Error::InvalidOperation {
                        reason: "parent must precede its children",
                    })
                }
            }
        }

        Ok(Skeleton { joints, by_label })
    }
}
